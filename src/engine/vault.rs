use crate::error::{ResetError, ResetResult};
use crate::logging::EventLog;
use fs_err as fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    BackupMissing,
}

/// Keeps the identity config (`user.conf`) safe across the reinstall.
pub struct ConfigVault<'a> {
    live: &'a Path,
    backup_dir: &'a Path,
    backup: &'a Path,
    log: &'a EventLog,
}

impl<'a> ConfigVault<'a> {
    pub fn new(live: &'a Path, backup_dir: &'a Path, backup: &'a Path, log: &'a EventLog) -> Self {
        Self {
            live,
            backup_dir,
            backup,
            log,
        }
    }

    /// Copy live -> backup, overwriting any previous backup. Returns `false`
    /// without touching anything when there is no live config.
    pub fn backup(&self) -> ResetResult<bool> {
        if !self.live.is_file() {
            return Ok(false);
        }
        if !self.backup_dir.is_dir() {
            fs::create_dir_all(self.backup_dir)
                .map_err(|e| ResetError::io("create backup directory", e))?;
            self.log.info("Backup directory created");
        }
        fs::copy(self.live, self.backup).map_err(|e| ResetError::io("copy user.conf", e))?;
        Ok(true)
    }

    /// Copy backup -> live, recreating the live config directory if needed.
    pub fn restore(&self) -> ResetResult<RestoreOutcome> {
        if !self.backup.is_file() {
            return Ok(RestoreOutcome::BackupMissing);
        }
        if let Some(parent) = self.live.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ResetError::io("create config directory", e))?;
        }
        fs::copy(self.backup, self.live).map_err(|e| ResetError::io("restore user.conf", e))?;
        Ok(RestoreOutcome::Restored)
    }

    /// Remove the staged `user.conf`, then the staging directory if nothing
    /// else is left in it. Returns whether anything was removed.
    pub fn cleanup(&self) -> ResetResult<bool> {
        if !self.backup_dir.is_dir() {
            return Ok(false);
        }
        let mut removed = false;
        if std::fs::symlink_metadata(self.backup).is_ok() {
            fs::remove_file(self.backup).map_err(|e| ResetError::io("remove backup file", e))?;
            removed = true;
        }

        let empty = fs::read_dir(self.backup_dir)
            .map_err(|e| ResetError::io("inspect backup directory", e))?
            .next()
            .is_none();
        if empty {
            fs::remove_dir(self.backup_dir)
                .map_err(|e| ResetError::io("remove backup directory", e))?;
            removed = true;
        } else {
            self.log.info(format!(
                "Backup directory kept, it holds other files: {}",
                self.backup_dir.display()
            ));
        }
        Ok(removed)
    }
}
