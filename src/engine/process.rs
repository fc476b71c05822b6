use crate::error::{ResetError, ResetResult};
use crate::host::{service_stop_fallback, ProcessHost};
use crate::logging::EventLog;
use crate::model::ResetConfig;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

const EXIT_POLL: Duration = Duration::from_millis(50);

/// Processes that were asked to stop during one `stop_all` pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub stopped: Vec<(String, u32)>,
}

impl StopReport {
    pub fn any_stopped(&self) -> bool {
        !self.stopped.is_empty()
    }
}

/// Stops and starts the target application's processes and service.
pub struct ProcessController<'a> {
    host: &'a dyn ProcessHost,
    log: &'a EventLog,
    cfg: &'a ResetConfig,
}

impl<'a> ProcessController<'a> {
    pub fn new(host: &'a dyn ProcessHost, log: &'a EventLog, cfg: &'a ResetConfig) -> Self {
        Self { host, log, cfg }
    }

    /// Best effort: service stop, kill every known process, then a second
    /// service stop through the service manager. Never fails.
    pub fn stop_all(&self) -> StopReport {
        self.log.info("Stopping AnyDesk services...");
        if let Err(e) = self.host.stop_service(&self.cfg.service_name) {
            self.log.info(format!("Service stop request ignored: {e}"));
        }

        let mut report = StopReport::default();
        for name in &self.cfg.process_names {
            let pids = match self.host.find_processes(name) {
                Ok(pids) => pids,
                Err(e) => {
                    debug!(%name, error = %e, "process lookup failed");
                    Vec::new()
                }
            };
            if pids.is_empty() {
                self.log
                    .info(format!("No {name} process found or already stopped"));
                continue;
            }

            for pid in pids {
                if let Err(e) = self.host.terminate(pid) {
                    self.log.info(format!(
                        "Terminate request for {name} (pid {pid}) failed: {e}"
                    ));
                    continue;
                }
                if self.wait_for_exit(pid) {
                    self.log.info(format!("Stopped: {name} (pid {pid})"));
                } else {
                    self.log.info(format!(
                        "Stop issued: {name} (pid {pid}) still exiting after {}",
                        humantime::format_duration(self.cfg.kill_timeout)
                    ));
                }
                report.stopped.push((name.clone(), pid));
            }
        }

        let (program, args) = service_stop_fallback(&self.cfg.service_name);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match self
            .host
            .run_hidden(program, &args, self.cfg.command_timeout)
        {
            Ok(code) => debug!(program, ?code, "fallback service stop finished"),
            Err(e) => self.log.info(format!("Command failed: {e}")),
        }

        report
    }

    /// Launch the installed executable without waiting for it.
    pub fn start_default(&self, executable: &Path) -> ResetResult<()> {
        if !executable.is_file() {
            return Err(ResetError::NotFound(executable.to_path_buf()));
        }
        self.host.spawn_detached(executable)
    }

    /// Poll until `pid` is gone or the kill timeout passes. Lookup errors
    /// count as gone.
    fn wait_for_exit(&self, pid: u32) -> bool {
        let deadline = Instant::now() + self.cfg.kill_timeout;
        loop {
            match self.host.is_running(pid) {
                Ok(true) => {}
                Ok(false) | Err(_) => return true,
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogLevel;
    use crate::testing::{drain, messages_at, sandbox_config, FakeHost, HostCall};
    use pretty_assertions::assert_eq;

    #[test]
    fn stops_every_known_process() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let host = FakeHost::with_processes(&[
            ("AnyDesk", vec![10, 11]),
            ("AnyDesk_Service", vec![20]),
        ]);
        let (log, mut rx) = EventLog::channel();

        let report = ProcessController::new(&host, &log, &cfg).stop_all();

        assert_eq!(
            report.stopped,
            vec![
                ("AnyDesk".to_string(), 10),
                ("AnyDesk".to_string(), 11),
                ("AnyDesk_Service".to_string(), 20),
            ]
        );
        assert!(host.running().is_empty());

        let calls = host.calls();
        assert_eq!(calls.first(), Some(&HostCall::StopService("AnyDesk".into())));
        assert!(matches!(calls.last(), Some(HostCall::RunHidden(_, _))));

        let events = drain(&mut rx);
        assert!(messages_at(&events, LogLevel::Info)
            .contains(&"Stopped: AnyDesk_Service (pid 20)".to_string()));
    }

    #[test]
    fn nothing_running_logs_info_only() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let host = FakeHost {
            fail_service: true,
            ..FakeHost::default()
        };
        let (log, mut rx) = EventLog::channel();

        let report = ProcessController::new(&host, &log, &cfg).stop_all();

        assert!(!report.any_stopped());
        let events = drain(&mut rx);
        assert!(messages_at(&events, LogLevel::Error).is_empty());
        assert!(messages_at(&events, LogLevel::Info)
            .contains(&"No AnyDesk process found or already stopped".to_string()));
    }

    #[test]
    fn stubborn_process_counts_as_stop_issued() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let mut host = FakeHost::with_processes(&[("AnyDesk", vec![42])]);
        host.stubborn.insert(42);
        let (log, mut rx) = EventLog::channel();

        let started = Instant::now();
        let report = ProcessController::new(&host, &log, &cfg).stop_all();

        assert!(started.elapsed() >= cfg.kill_timeout);
        assert_eq!(report.stopped, vec![("AnyDesk".to_string(), 42)]);
        let events = drain(&mut rx);
        assert!(messages_at(&events, LogLevel::Info)
            .iter()
            .any(|m| m.starts_with("Stop issued: AnyDesk (pid 42)")));
    }

    #[test]
    fn refused_terminate_is_not_reported_as_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let mut host = FakeHost::with_processes(&[("AnyDesk", vec![9])]);
        host.refuse_terminate.insert(9);
        let (log, mut rx) = EventLog::channel();

        let report = ProcessController::new(&host, &log, &cfg).stop_all();

        assert!(!report.any_stopped());
        assert_eq!(host.running(), vec![9]);
        let infos = messages_at(&drain(&mut rx), LogLevel::Info);
        assert!(infos.contains(
            &"Terminate request for AnyDesk (pid 9) failed: external tool `taskkill` failed: access denied"
                .to_string()
        ));
        assert!(!infos.iter().any(|m| m.contains("already stopped")));
    }

    #[test]
    fn start_default_requires_executable() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = sandbox_config(dir.path());
        let host = FakeHost::default();
        let (log, _rx) = EventLog::channel();
        let controller = ProcessController::new(&host, &log, &cfg);

        let err = controller.start_default(&cfg.default_executable).unwrap_err();
        assert!(matches!(err, ResetError::NotFound(_)));
        assert!(host.spawned().is_empty());

        std::fs::create_dir_all(cfg.default_executable.parent().unwrap()).unwrap();
        std::fs::write(&cfg.default_executable, b"MZ").unwrap();
        controller.start_default(&cfg.default_executable).unwrap();
        assert_eq!(host.spawned(), vec![cfg.default_executable.clone()]);
    }
}
