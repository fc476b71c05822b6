//! The step table. Order is fixed; each action catches its own benign
//! conditions and returns `Err` only for real failures or cancellation.

use super::controller::ResetOrchestrator;
use crate::engine::RestoreOutcome;
use crate::error::{ResetError, ResetResult};
use crate::model::{LogLevel, RunState, StepOutcome};

const DOWNLOAD_HINT: &str = "Please download from: https://anydesk.com/en/downloads";

pub(crate) type StepAction = fn(&ResetOrchestrator<'_>, &mut RunState) -> ResetResult<Verdict>;

/// A step outcome and the level its single log line is written at.
pub(crate) struct Verdict {
    pub outcome: StepOutcome,
    pub level: LogLevel,
}

impl Verdict {
    fn warning(outcome: StepOutcome) -> Self {
        Self {
            outcome,
            level: LogLevel::Warning,
        }
    }
}

impl From<StepOutcome> for Verdict {
    fn from(outcome: StepOutcome) -> Self {
        let level = match outcome {
            StepOutcome::Ok(_) => LogLevel::Success,
            StepOutcome::Skipped(_) => LogLevel::Info,
            StepOutcome::Failed(_) => LogLevel::Error,
        };
        Self { outcome, level }
    }
}

pub(crate) struct Step {
    pub id: u8,
    pub name: &'static str,
    pub header: &'static str,
    pub action: StepAction,
}

pub(crate) const STEPS: [Step; 9] = [
    Step {
        id: 1,
        name: "Check installer",
        header: "Checking for AnyDesk installer...",
        action: check_installer,
    },
    Step {
        id: 2,
        name: "Back up identity config",
        header: "Backing up user configuration...",
        action: backup_config,
    },
    Step {
        id: 3,
        name: "Stop processes",
        header: "Stopping AnyDesk processes...",
        action: stop_processes,
    },
    Step {
        id: 4,
        name: "Remove traces",
        header: "Removing AnyDesk traces...",
        action: remove_traces,
    },
    Step {
        id: 5,
        name: "Install",
        header: "Installing AnyDesk...",
        action: install,
    },
    Step {
        id: 6,
        name: "Stop processes again",
        header: "Stopping AnyDesk after installation...",
        action: stop_processes,
    },
    Step {
        id: 7,
        name: "Restore identity config",
        header: "Restoring user configuration...",
        action: restore_config,
    },
    Step {
        id: 8,
        name: "Launch",
        header: "Launching AnyDesk...",
        action: launch,
    },
    Step {
        id: 9,
        name: "Clean up",
        header: "Cleaning up...",
        action: cleanup,
    },
];

fn check_installer(o: &ResetOrchestrator<'_>, state: &mut RunState) -> ResetResult<Verdict> {
    if let Some(path) = &state.installer_path {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        return Ok(StepOutcome::Ok(format!("Installer found: {name}")).into());
    }

    o.log.warn(format!(
        "AnyDesk installer not found in {}",
        o.cfg.installer_dir.display()
    ));
    o.log.info(DOWNLOAD_HINT);
    let prompt = "AnyDesk installer not found. Without the installer, automatic \
                  reinstallation will be skipped. Continue with removal only?";
    if o.operator.confirm_continue(prompt) {
        Ok(StepOutcome::Skipped("User chose to continue without installer".into()).into())
    } else {
        Err(ResetError::UserCancelled("missing installer".into()))
    }
}

fn backup_config(o: &ResetOrchestrator<'_>, state: &mut RunState) -> ResetResult<Verdict> {
    state.backup_exists = false;
    let outcome = if o.vault(state).backup()? {
        state.backup_exists = true;
        StepOutcome::Ok("Backup created successfully".into())
    } else {
        StepOutcome::Skipped("user.conf not found - skipping backup".into())
    };
    Ok(outcome.into())
}

fn stop_processes(o: &ResetOrchestrator<'_>, _state: &mut RunState) -> ResetResult<Verdict> {
    let outcome = if o.processes().stop_all().any_stopped() {
        StepOutcome::Ok("All AnyDesk processes stopped".into())
    } else {
        StepOutcome::Skipped("No AnyDesk processes were running".into())
    };
    Ok(outcome.into())
}

fn remove_traces(o: &ResetOrchestrator<'_>, _state: &mut RunState) -> ResetResult<Verdict> {
    let summary = o.traces().remove_all(&o.cfg.trace_dirs);
    let outcome = if !summary.failed.is_empty() {
        StepOutcome::Failed(format!(
            "Failed to delete {} of {} trace path(s)",
            summary.failed.len(),
            o.cfg.trace_dirs.len()
        ))
    } else if summary.any_deleted() {
        StepOutcome::Ok("AnyDesk traces removed".into())
    } else {
        StepOutcome::Skipped("No AnyDesk traces found to remove".into())
    };
    Ok(outcome.into())
}

fn install(o: &ResetOrchestrator<'_>, state: &mut RunState) -> ResetResult<Verdict> {
    let Some(path) = state.installer_path.as_deref() else {
        return Ok(StepOutcome::Skipped("Skipping installation - no installer found".into()).into());
    };
    o.installer()
        .install(path, o.host, o.operator, o.cfg.installer_settle)?;
    Ok(StepOutcome::Ok("Installation completed by user".into()).into())
}

fn restore_config(o: &ResetOrchestrator<'_>, state: &mut RunState) -> ResetResult<Verdict> {
    if !state.backup_exists {
        return Ok(StepOutcome::Skipped("Skipping restoration - no backup available".into()).into());
    }
    match o.vault(state).restore()? {
        RestoreOutcome::Restored => Ok(StepOutcome::Ok("user.conf restored successfully".into()).into()),
        RestoreOutcome::BackupMissing => Ok(Verdict::warning(StepOutcome::Skipped(
            "Backup file not found - skipping restoration".into(),
        ))),
    }
}

fn launch(o: &ResetOrchestrator<'_>, _state: &mut RunState) -> ResetResult<Verdict> {
    let outcome = match o.processes().start_default(&o.cfg.default_executable) {
        Ok(()) => StepOutcome::Ok("AnyDesk started successfully".into()),
        Err(ResetError::NotFound(_)) => StepOutcome::Failed("AnyDesk executable not found".into()),
        Err(e) => return Err(e),
    };
    Ok(outcome.into())
}

fn cleanup(o: &ResetOrchestrator<'_>, state: &mut RunState) -> ResetResult<Verdict> {
    let outcome = if o.vault(state).cleanup()? {
        StepOutcome::Ok("Backup files cleaned up".into())
    } else {
        StepOutcome::Skipped("No backup files to clean up".into())
    };
    Ok(outcome.into())
}
