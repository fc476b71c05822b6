use crate::host::{OsHost, ProcessHost};
use crate::logging::EventLog;
use crate::model::{LogEvent, ResetConfig, RunOutcome, RunSummary};
use crate::orchestrator::ResetOrchestrator;
use crate::prompt::ConsoleOperator;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const APP_DIR: &str = "AnyDesk";
const CONFIG_FILE: &str = "user.conf";
const BACKUP_DIR: &str = "anydesk_backup";
const PROGRAM_DATA_DIR: &str = r"C:\ProgramData\AnyDesk";
const PROGRAM_FILES_DIR: &str = r"C:\Program Files (x86)\AnyDesk";
const EXECUTABLE: &str = "AnyDesk.exe";
const INSTALLER_PATTERN: &str = "AnyDesk*.exe";
const PROCESS_NAMES: &[&str] = &["AnyDesk", "AnyDesk_Service"];
const SERVICE_NAME: &str = "AnyDesk";

/// What the writer thread prints.
enum Output {
    /// Run log event, rendered as text or a JSON line.
    Event(LogEvent),
    /// Pre-rendered summary block.
    Summary(Vec<String>),
    /// Operator hint on stderr.
    Notice(String),
}

fn render_event(ev: &LogEvent, json: bool) -> String {
    if !json {
        return ev.to_line();
    }
    match serde_json::to_string(ev) {
        Ok(line) => line,
        Err(e) => {
            debug!(error = %e, "log event not serializable, falling back to text");
            ev.to_line()
        }
    }
}

/// Stdout/stderr writer on a blocking thread, so log lines never stall the
/// runtime and keep their send order.
fn spawn_output_writer(json: bool) -> (mpsc::UnboundedSender<Output>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Output>();
    let handle = tokio::task::spawn_blocking(move || {
        let mut out = std::io::LineWriter::new(std::io::stdout().lock());
        let mut err = std::io::LineWriter::new(std::io::stderr().lock());

        while let Some(item) = rx.blocking_recv() {
            let _ = match item {
                Output::Event(ev) => writeln!(out, "{}", render_event(&ev, json)),
                Output::Summary(lines) => lines.iter().try_for_each(|l| writeln!(out, "{l}")),
                Output::Notice(msg) => writeln!(err, "{msg}"),
            };
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "anydesk-reset",
    version,
    about = "Uninstall, reinstall and relaunch AnyDesk while keeping its ID"
)]
pub struct Cli {
    /// Folder searched for the AnyDesk*.exe installer (default: Resources next to this program)
    #[arg(long, env = "ANYDESK_RESET_INSTALLER_DIR")]
    pub installer_dir: Option<PathBuf>,

    /// Folder that receives the anydesk_backup staging folder (default: Downloads)
    #[arg(long, env = "ANYDESK_RESET_BACKUP_ROOT")]
    pub backup_root: Option<PathBuf>,

    /// Continue without asking when no installer is found
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print log events as JSON lines and finish with a JSON summary
    #[arg(long)]
    pub json: bool,

    /// How long to wait for each killed process to exit
    #[arg(long, default_value = "5s")]
    pub kill_timeout: humantime::Duration,

    /// Bound for service and helper commands
    #[arg(long, default_value = "5s")]
    pub command_timeout: humantime::Duration,

    /// Pause after starting the installer before showing the guide
    #[arg(long, default_value = "1s")]
    pub installer_settle: humantime::Duration,

    /// Run even without administrator privileges
    #[arg(long)]
    pub skip_elevation_check: bool,
}

/// How the command ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished(RunOutcome),
    NotElevated,
}

impl Completion {
    pub fn exit_code(self) -> i32 {
        match self {
            Completion::Finished(RunOutcome::Success) => 0,
            Completion::Finished(RunOutcome::CompletedWithFailures) => 1,
            Completion::Finished(RunOutcome::Cancelled) => 2,
            Completion::NotElevated => 3,
        }
    }
}

pub async fn run(args: Cli) -> Result<Completion> {
    let cfg = build_config(&args)?;
    let json = args.json;
    let check_elevation = !args.skip_elevation_check;
    let (out_tx, out_handle) = spawn_output_writer(json);
    let (log, mut evt_rx) = EventLog::channel();

    // The sequence blocks (process waits, operator input), so it gets its own
    // thread. Events stream back over the channel in order.
    let handle = tokio::task::spawn_blocking(move || -> Option<RunSummary> {
        let host = OsHost::new(cfg.command_timeout);
        if check_elevation && !host.has_elevated_privileges() {
            log.error("Administrator privileges required. Please re-run as Administrator.");
            return None;
        }
        let operator = ConsoleOperator::new(log.clone(), cfg.assume_yes);
        Some(ResetOrchestrator::new(&cfg, &host, &operator, log).run())
    });

    while let Some(ev) = evt_rx.recv().await {
        let _ = out_tx.send(Output::Event(ev));
    }

    let summary = handle.await.context("reset task failed")?;
    let completion = match summary {
        Some(summary) => {
            let lines = if json {
                vec![serde_json::to_string_pretty(&summary).context("serialize run summary")?]
            } else {
                crate::text_summary::build_text_summary(&summary).lines
            };
            let _ = out_tx.send(Output::Summary(lines));
            Completion::Finished(summary.outcome)
        }
        None => {
            let _ = out_tx.send(Output::Notice(
                "Re-run from an elevated prompt or pass --skip-elevation-check.".into(),
            ));
            Completion::NotElevated
        }
    };

    drop(out_tx);
    let _ = out_handle.await;
    Ok(completion)
}

/// Build a `ResetConfig` from CLI arguments and the user's known folders.
pub fn build_config(args: &Cli) -> Result<ResetConfig> {
    let app_data = dirs::config_dir()
        .context("cannot resolve the roaming AppData folder")?
        .join(APP_DIR);
    let local_app_data = dirs::data_local_dir()
        .context("cannot resolve the local AppData folder")?
        .join(APP_DIR);

    // Always a dedicated subfolder; step 9 may delete it.
    let backup_dir = match &args.backup_root {
        Some(root) => root.clone(),
        None => dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .context("cannot resolve the Downloads folder")?,
    }
    .join(BACKUP_DIR);

    let installer_dir = match &args.installer_dir {
        Some(dir) => dir.clone(),
        None => {
            let exe = std::env::current_exe().context("locate the running executable")?;
            exe.parent()
                .map(|dir| dir.join("Resources"))
                .unwrap_or_else(|| PathBuf::from("Resources"))
        }
    };

    let program_files = PathBuf::from(PROGRAM_FILES_DIR);
    Ok(ResetConfig {
        live_config: app_data.join(CONFIG_FILE),
        backup_config: backup_dir.join(CONFIG_FILE),
        backup_dir,
        trace_dirs: vec![
            PathBuf::from(PROGRAM_DATA_DIR),
            app_data,
            local_app_data,
            program_files.clone(),
        ],
        default_executable: program_files.join(EXECUTABLE),
        installer_dir,
        installer_pattern: INSTALLER_PATTERN.to_string(),
        process_names: PROCESS_NAMES.iter().map(|s| s.to_string()).collect(),
        service_name: SERVICE_NAME.to_string(),
        kill_timeout: Duration::from(args.kill_timeout),
        command_timeout: Duration::from(args.command_timeout),
        installer_settle: Duration::from(args.installer_settle),
        assume_yes: args.yes,
    })
}
