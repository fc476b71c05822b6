use crate::logging::EventLog;
use fs_err as fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TraceSummary {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl TraceSummary {
    pub fn any_deleted(&self) -> bool {
        !self.deleted.is_empty()
    }
}

/// Deletes installation and data directories left by the application.
pub struct TraceRemover<'a> {
    log: &'a EventLog,
}

impl<'a> TraceRemover<'a> {
    pub fn new(log: &'a EventLog) -> Self {
        Self { log }
    }

    /// Delete each path that exists. A failure on one path is logged and the
    /// rest are still attempted.
    pub fn remove_all(&self, paths: &[PathBuf]) -> TraceSummary {
        let mut summary = TraceSummary::default();
        for path in paths {
            if std::fs::symlink_metadata(path).is_err() {
                continue;
            }
            match remove_path(path) {
                Ok(()) => {
                    self.log.info(format!("Deleted: {}", path.display()));
                    summary.deleted.push(path.clone());
                }
                Err(e) => {
                    self.log
                        .error(format!("Failed to delete {}: {e}", path.display()));
                    summary.failed.push(path.clone());
                }
            }
        }
        summary
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogLevel;
    use crate::testing::{drain, messages_at, sandbox_config};
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_only_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let present = [cfg.trace_dirs[0].clone(), cfg.trace_dirs[3].clone()];
        for p in &present {
            std::fs::create_dir_all(p.join("nested")).unwrap();
            std::fs::write(p.join("nested/file.bin"), b"data").unwrap();
        }
        let (log, mut rx) = EventLog::channel();

        let summary = TraceRemover::new(&log).remove_all(&cfg.trace_dirs);

        assert!(summary.any_deleted());
        assert_eq!(summary.deleted, present.to_vec());
        assert!(summary.failed.is_empty());
        for p in &cfg.trace_dirs {
            assert!(!p.exists());
        }
        let events = drain(&mut rx);
        assert!(messages_at(&events, LogLevel::Error).is_empty());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn nothing_present_reports_nothing_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let (log, mut rx) = EventLog::channel();

        let summary = TraceRemover::new(&log).remove_all(&cfg.trace_dirs);

        assert!(!summary.any_deleted());
        assert!(drain(&mut rx).is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn undeletable_path_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("ProgramData/AnyDesk");
        let after = dir.path().join("AppData/Local/AnyDesk");
        for p in [&before, &after] {
            std::fs::create_dir_all(p).unwrap();
            std::fs::write(p.join("trace.bin"), b"data").unwrap();
        }
        // procfs entries refuse unlink even for root.
        let stuck = PathBuf::from("/proc/self/fdinfo");
        let paths = vec![before.clone(), stuck.clone(), after.clone()];
        let (log, mut rx) = EventLog::channel();

        let summary = TraceRemover::new(&log).remove_all(&paths);

        assert_eq!(summary.deleted, vec![before.clone(), after.clone()]);
        assert_eq!(summary.failed, vec![stuck]);
        assert!(!before.exists());
        assert!(!after.exists());
        let events = drain(&mut rx);
        let errors = messages_at(&events, LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to delete /proc/self/fdinfo"));
        assert_eq!(messages_at(&events, LogLevel::Info).len(), 2);
    }
}
