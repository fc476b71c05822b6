//! Human decision points.
//!
//! The reset sequence asks the operator exactly two things: whether to carry on
//! without an installer, and when the interactive installer has finished.

use crate::logging::EventLog;
use std::io::BufRead;
use std::path::Path;

pub trait Operator {
    /// Yes/no decision. `false` cancels the run.
    fn confirm_continue(&self, prompt: &str) -> bool;
    /// Block until the operator signals the installer is done. No timeout.
    fn await_install_done(&self, installer: &Path);
}

const GUIDE_LINES: &[&str] = &[
    "Follow these steps to complete installation. When finished, press Enter.",
    "  Step 1: in the AnyDesk window choose \"Install AnyDesk on this device\".",
    "  Step 2: keep the default install location, accept the license and click \"Accept & Install\".",
];

/// Terminal operator. Prompts go through the event log so they are printed
/// after everything logged before them.
pub struct ConsoleOperator {
    log: EventLog,
    assume_yes: bool,
}

impl ConsoleOperator {
    pub fn new(log: EventLog, assume_yes: bool) -> Self {
        Self { log, assume_yes }
    }

    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

/// `y`/`yes` in any case accepts; anything else, including EOF, declines.
pub fn parse_yes(answer: Option<&str>) -> bool {
    matches!(
        answer.map(|a| a.trim().to_ascii_lowercase()).as_deref(),
        Some("y") | Some("yes")
    )
}

impl Operator for ConsoleOperator {
    fn confirm_continue(&self, prompt: &str) -> bool {
        if self.assume_yes {
            self.log.info(format!("{prompt} [y/N] y (--yes)"));
            return true;
        }
        self.log.warn(format!("{prompt} [y/N]"));
        parse_yes(self.read_line().as_deref())
    }

    fn await_install_done(&self, installer: &Path) {
        self.log.info(format!(
            "AnyDesk installation guide ({})",
            installer.file_name().unwrap_or_default().to_string_lossy()
        ));
        for line in GUIDE_LINES {
            self.log.info(*line);
        }
        // EOF is treated as "done" so piped input cannot hang the run.
        let _ = self.read_line();
    }
}
