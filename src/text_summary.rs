//! Text summary builder for CLI output.
//!
//! Formats the per-step table printed after the log stream in text mode.

use crate::model::{RunOutcome, RunSummary};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(summary: &RunSummary) -> TextSummary {
    let mut lines = vec![String::new(), "Summary:".to_string()];

    for step in &summary.steps {
        lines.push(format!(
            "  {}. {:<24} {:<8} {}",
            step.id,
            step.name,
            step.outcome.label(),
            step.outcome.detail()
        ));
    }

    let installer = summary
        .installer
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".into());
    lines.push(format!("Installer: {installer}"));
    lines.push(format!(
        "Identity backup: {}",
        if summary.backup_created {
            "created"
        } else {
            "not created"
        }
    ));
    let result = match summary.outcome {
        RunOutcome::Success => "success",
        RunOutcome::CompletedWithFailures => "completed with failures",
        RunOutcome::Cancelled => "cancelled",
    };
    lines.push(format!("Result: {result}"));

    TextSummary { lines }
}
