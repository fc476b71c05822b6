use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;

/// Fully resolved settings for one reset run. Every path is fixed before step 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    /// Identity config of the live installation (`<AppData>/AnyDesk/user.conf`).
    pub live_config: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_config: PathBuf,
    /// Directories wiped in step 4, in order.
    pub trace_dirs: Vec<PathBuf>,
    pub default_executable: PathBuf,
    pub installer_dir: PathBuf,
    pub installer_pattern: String,
    pub process_names: Vec<String>,
    pub service_name: String,
    #[serde(with = "humantime_serde")]
    pub kill_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub installer_settle: Duration,
    pub assume_yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    fn tag(self) -> Option<&'static str> {
        match self {
            LogLevel::Info => None,
            LogLevel::Warning => Some("[WARNING]"),
            LogLevel::Error => Some("[ERROR]"),
            LogLevel::Success => Some("[OK]"),
        }
    }
}

/// One line of the append-only run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
            level,
            message: message.into(),
        }
    }

    /// Render as `[HH:MM:SS] [LEVEL] message` for console output.
    pub fn to_line(&self) -> String {
        let clock = self
            .timestamp
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| "--:--:--".into());
        match self.level.tag() {
            Some(tag) => format!("[{clock}] {tag} {}", self.message),
            None => format!("[{clock}] {}", self.message),
        }
    }
}

/// Mutable state shared by the steps of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub config_backup_path: PathBuf,
    pub live_config_path: PathBuf,
    /// Set only after a successful live -> backup copy; gates the restore step.
    pub backup_exists: bool,
    /// Resolved once before step 1.
    pub installer_path: Option<PathBuf>,
}

impl RunState {
    pub fn new(cfg: &ResetConfig, installer_path: Option<PathBuf>) -> Self {
        Self {
            config_backup_path: cfg.backup_config.clone(),
            live_config_path: cfg.live_config.clone(),
            backup_exists: false,
            installer_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok(String),
    Skipped(String),
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Ok(_) => "ok",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Failed(_) => "failed",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Ok(d) | StepOutcome::Skipped(d) | StepOutcome::Failed(d) => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub id: u8,
    pub name: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    CompletedWithFailures,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub steps: Vec<StepReport>,
    pub installer: Option<PathBuf>,
    pub backup_created: bool,
    pub config: ResetConfig,
}

impl RunSummary {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.outcome.is_failed())
    }
}
