//! Operating-system capabilities consumed by the reset sequence.
//!
//! Everything that touches processes or services goes through `ProcessHost`, so
//! the components can be driven by a scripted host in tests. `OsHost` shells out
//! to the platform tools (`tasklist`/`taskkill`/`sc` on Windows, `pgrep`/`kill`/
//! `systemctl` elsewhere).

use crate::error::{ResetError, ResetResult};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub trait ProcessHost {
    /// Pids of running processes whose image name matches `name` (without `.exe`).
    fn find_processes(&self, name: &str) -> ResetResult<Vec<u32>>;
    fn terminate(&self, pid: u32) -> ResetResult<()>;
    fn is_running(&self, pid: u32) -> ResetResult<bool>;
    /// Ask the service manager to stop `name`.
    fn stop_service(&self, name: &str) -> ResetResult<()>;
    /// Run a command with no window and wait at most `timeout`.
    /// Returns the exit code if it finished in time.
    fn run_hidden(&self, program: &str, args: &[&str], timeout: Duration)
        -> ResetResult<Option<i32>>;
    /// Start `path` and return immediately.
    fn spawn_detached(&self, path: &Path) -> ResetResult<()>;
    fn has_elevated_privileges(&self) -> bool;
}

/// Command used as a second attempt at stopping the service.
pub fn service_stop_fallback(service: &str) -> (&'static str, Vec<String>) {
    if cfg!(windows) {
        ("sc", vec!["stop".to_string(), service.to_string()])
    } else {
        (
            "service",
            vec![service.to_ascii_lowercase(), "stop".to_string()],
        )
    }
}

/// Parse `tasklist /FO CSV /NH` output into pids. Non-CSV lines (the
/// "No tasks are running" notice) are ignored.
pub fn parse_tasklist_csv(output: &str) -> Vec<u32> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('"'))
        .filter_map(|line| line.split("\",\"").nth(1))
        .filter_map(|pid| pid.trim_matches('"').parse::<u32>().ok())
        .collect()
}

/// Parse one-pid-per-line output (`pgrep`).
pub fn parse_pid_lines(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

pub struct OsHost {
    command_timeout: Duration,
}

impl OsHost {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    fn base_command(program: &str) -> Command {
        #[allow(unused_mut)]
        let mut cmd = Command::new(program);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }

    /// Run to completion and capture stdout. Exit status is ignored; callers
    /// interpret empty output as "nothing matched".
    fn capture(&self, program: &str, args: &[&str]) -> ResetResult<String> {
        debug!(program, ?args, "capturing command output");
        let output = Self::base_command(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ResetError::tool(program, e.to_string()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn expect_success(&self, program: &str, args: &[&str]) -> ResetResult<()> {
        match self.run_hidden(program, args, self.command_timeout)? {
            Some(0) => Ok(()),
            Some(code) => Err(ResetError::tool(program, format!("exited with status {code}"))),
            None => Err(ResetError::tool(
                program,
                format!("did not finish within {:?}", self.command_timeout),
            )),
        }
    }
}

impl ProcessHost for OsHost {
    fn find_processes(&self, name: &str) -> ResetResult<Vec<u32>> {
        if cfg!(windows) {
            let filter = format!("IMAGENAME eq {name}.exe");
            let out = self.capture("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"])?;
            Ok(parse_tasklist_csv(&out))
        } else {
            let out = self.capture("pgrep", &["-i", "-x", name])?;
            Ok(parse_pid_lines(&out))
        }
    }

    fn terminate(&self, pid: u32) -> ResetResult<()> {
        let pid = pid.to_string();
        if cfg!(windows) {
            self.expect_success("taskkill", &["/PID", &pid, "/F"])
        } else {
            self.expect_success("kill", &["-9", &pid])
        }
    }

    fn is_running(&self, pid: u32) -> ResetResult<bool> {
        if cfg!(windows) {
            let filter = format!("PID eq {pid}");
            let out = self.capture("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"])?;
            Ok(parse_tasklist_csv(&out).contains(&pid))
        } else {
            let code = self.run_hidden("kill", &["-0", &pid.to_string()], self.command_timeout)?;
            Ok(code == Some(0))
        }
    }

    fn stop_service(&self, name: &str) -> ResetResult<()> {
        if cfg!(windows) {
            let script =
                format!("Try {{ Stop-Service -Name '{name}' -Force -ErrorAction Stop }} Catch {{ }}");
            self.expect_success("powershell", &["-NoProfile", "-Command", &script])
        } else {
            let unit = name.to_ascii_lowercase();
            self.expect_success("systemctl", &["stop", &unit])
        }
    }

    fn run_hidden(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> ResetResult<Option<i32>> {
        debug!(program, ?args, ?timeout, "running hidden command");
        let mut child = Self::base_command(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ResetError::tool(program, e.to_string()))?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code()),
                Ok(None) if Instant::now() >= deadline => {
                    debug!(program, "command still running after bound, leaving it");
                    return Ok(None);
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ResetError::tool(program, e.to_string())),
            }
        }
    }

    fn spawn_detached(&self, path: &Path) -> ResetResult<()> {
        debug!(path = %path.display(), "spawning detached process");
        Command::new(path)
            .spawn()
            .map(|_child| ())
            .map_err(|e| ResetError::io(format!("failed to start {}", path.display()), e))
    }

    fn has_elevated_privileges(&self) -> bool {
        if cfg!(windows) {
            matches!(
                self.run_hidden("net", &["session"], self.command_timeout),
                Ok(Some(0))
            )
        } else {
            self.capture("id", &["-u"])
                .map(|out| out.trim() == "0")
                .unwrap_or(false)
        }
    }
}
