use crate::error::ResetResult;
use crate::host::ProcessHost;
use crate::logging::EventLog;
use crate::prompt::Operator;
use fs_err as fs;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Finds and runs the bundled installer.
pub struct Installer<'a> {
    dir: &'a Path,
    pattern: &'a str,
    log: &'a EventLog,
}

impl<'a> Installer<'a> {
    pub fn new(dir: &'a Path, pattern: &'a str, log: &'a EventLog) -> Self {
        Self { dir, pattern, log }
    }

    /// Most recently modified file in the search directory whose name matches
    /// the installer pattern.
    pub fn locate(&self) -> Option<PathBuf> {
        if !self.dir.is_dir() {
            self.log.info(format!(
                "Installer folder not found: {}",
                self.dir.display()
            ));
            return None;
        }
        let pattern = match Pattern::new(self.pattern) {
            Ok(p) => p,
            Err(e) => {
                self.log
                    .error(format!("Invalid installer pattern {:?}: {e}", self.pattern));
                return None;
            }
        };
        let entries = match fs::read_dir(self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.log.error(format!("Searching for installer: {e}"));
                return None;
            }
        };

        let newest = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                pattern.matches_with(&entry.file_name().to_string_lossy(), MATCH_OPTIONS)
            })
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                meta.is_file()
                    .then(|| (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), entry.path()))
            })
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, path)| path);

        debug!(dir = %self.dir.display(), found = ?newest, "installer lookup");
        if newest.is_none() {
            self.log.info(format!(
                "No file matching {} in {}",
                self.pattern,
                self.dir.display()
            ));
        }
        newest
    }

    /// Start the installer detached, give its window `settle` to appear, then
    /// hand over to the operator until they report it finished.
    pub fn install(
        &self,
        path: &Path,
        host: &dyn ProcessHost,
        operator: &dyn Operator,
        settle: Duration,
    ) -> ResetResult<()> {
        self.log.info(format!("Installer: {}", path.display()));
        host.spawn_detached(path)?;
        std::thread::sleep(settle);
        operator.await_install_done(path);
        Ok(())
    }
}
