//! Reset run controller.
//!
//! Runs the step table strictly in order on the calling thread. A step that
//! fails is logged and recorded; the next step still runs. Only operator
//! cancellation at the installer check ends the run early.

use super::steps::{Step, Verdict, STEPS};
use crate::engine::{ConfigVault, Installer, ProcessController, TraceRemover};
use crate::error::ResetError;
use crate::host::ProcessHost;
use crate::logging::EventLog;
use crate::model::{ResetConfig, RunOutcome, RunState, RunSummary, StepOutcome, StepReport};
use crate::prompt::Operator;
use tracing::debug;

pub(crate) struct ResetOrchestrator<'a> {
    pub(super) cfg: &'a ResetConfig,
    pub(super) host: &'a dyn ProcessHost,
    pub(super) operator: &'a dyn Operator,
    pub(super) log: EventLog,
}

impl<'a> ResetOrchestrator<'a> {
    pub fn new(
        cfg: &'a ResetConfig,
        host: &'a dyn ProcessHost,
        operator: &'a dyn Operator,
        log: EventLog,
    ) -> Self {
        Self {
            cfg,
            host,
            operator,
            log,
        }
    }

    pub fn run(&self) -> RunSummary {
        self.log.info("=== AnyDesk Reset & Reinstall Tool ===");
        self.log.info("Starting process...");

        // Resolved once; never looked up again during the run.
        let installer = self.installer().locate();
        let mut state = RunState::new(self.cfg, installer);
        let mut steps = Vec::with_capacity(STEPS.len());
        let mut outcome = RunOutcome::Success;

        for step in &STEPS {
            match self.execute(step, &mut state) {
                Ok(report) => {
                    if report.outcome.is_failed() {
                        outcome = RunOutcome::CompletedWithFailures;
                    }
                    steps.push(report);
                }
                Err(e) => {
                    self.log.error(format!(
                        "Process failed at step {} ({}): {e}",
                        step.id, step.name
                    ));
                    steps.push(StepReport {
                        id: step.id,
                        name: step.name.to_string(),
                        outcome: StepOutcome::Failed(e.to_string()),
                    });
                    outcome = RunOutcome::Cancelled;
                    break;
                }
            }
        }

        let summary = RunSummary {
            outcome,
            steps,
            installer: state.installer_path.clone(),
            backup_created: state.backup_exists,
            config: self.cfg.clone(),
        };
        self.log_final(&summary);
        summary
    }

    /// Run one step and log its outcome. Only cancellation comes back as `Err`.
    pub(super) fn execute(
        &self,
        step: &Step,
        state: &mut RunState,
    ) -> Result<StepReport, ResetError> {
        self.log
            .info(format!("[{}/{}] {}", step.id, STEPS.len(), step.header));
        let verdict: Verdict = match (step.action)(self, state) {
            Ok(verdict) => verdict,
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) if e.is_benign() => StepOutcome::Skipped(e.to_string()).into(),
            Err(e) => StepOutcome::Failed(e.to_string()).into(),
        };
        let Verdict { outcome, level } = verdict;
        debug!(step = step.id, outcome = outcome.label(), "step finished");

        self.log.emit(level, outcome.detail());
        Ok(StepReport {
            id: step.id,
            name: step.name.to_string(),
            outcome,
        })
    }

    fn log_final(&self, summary: &RunSummary) {
        match summary.outcome {
            RunOutcome::Success => self
                .log
                .success("All actions completed. AnyDesk is ready to use."),
            RunOutcome::CompletedWithFailures => {
                let failed: Vec<String> = summary
                    .failed_steps()
                    .map(|s| format!("{} ({})", s.id, s.name))
                    .collect();
                self.log.error(format!(
                    "Reset finished with failed steps: {}",
                    failed.join(", ")
                ));
            }
            // The cancelling step already logged the terminating error.
            RunOutcome::Cancelled => {}
        }
    }

    pub(super) fn vault<'s>(&'s self, state: &'s RunState) -> ConfigVault<'s> {
        ConfigVault::new(
            &state.live_config_path,
            &self.cfg.backup_dir,
            &state.config_backup_path,
            &self.log,
        )
    }

    pub(super) fn processes(&self) -> ProcessController<'_> {
        ProcessController::new(self.host, &self.log, self.cfg)
    }

    pub(super) fn traces(&self) -> TraceRemover<'_> {
        TraceRemover::new(&self.log)
    }

    pub(super) fn installer(&self) -> Installer<'_> {
        Installer::new(&self.cfg.installer_dir, &self.cfg.installer_pattern, &self.log)
    }
}
