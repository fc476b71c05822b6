//! Scripted collaborators for unit tests.

use crate::error::{ResetError, ResetResult};
use crate::host::ProcessHost;
use crate::model::{LogEvent, LogLevel, ResetConfig};
use crate::prompt::Operator;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Find(String),
    Terminate(u32),
    StopService(String),
    RunHidden(String, Vec<String>),
    Spawn(PathBuf),
}

/// In-memory process table. Terminated pids disappear unless listed in
/// `stubborn`; pids in `refuse_terminate` reject the request outright.
#[derive(Default)]
pub struct FakeHost {
    pub processes: RefCell<BTreeMap<String, Vec<u32>>>,
    pub stubborn: BTreeSet<u32>,
    pub refuse_terminate: BTreeSet<u32>,
    pub fail_spawn: bool,
    pub fail_service: bool,
    pub calls: RefCell<Vec<HostCall>>,
}

impl FakeHost {
    pub fn with_processes(entries: &[(&str, Vec<u32>)]) -> Self {
        let host = Self::default();
        for (name, pids) in entries {
            host.processes
                .borrow_mut()
                .insert(name.to_string(), pids.clone());
        }
        host
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Spawn(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn running(&self) -> Vec<u32> {
        self.processes.borrow().values().flatten().copied().collect()
    }
}

impl ProcessHost for FakeHost {
    fn find_processes(&self, name: &str) -> ResetResult<Vec<u32>> {
        self.calls.borrow_mut().push(HostCall::Find(name.into()));
        Ok(self.processes.borrow().get(name).cloned().unwrap_or_default())
    }

    fn terminate(&self, pid: u32) -> ResetResult<()> {
        self.calls.borrow_mut().push(HostCall::Terminate(pid));
        if self.refuse_terminate.contains(&pid) {
            return Err(ResetError::tool("taskkill", "access denied"));
        }
        if !self.stubborn.contains(&pid) {
            for pids in self.processes.borrow_mut().values_mut() {
                pids.retain(|p| *p != pid);
            }
        }
        Ok(())
    }

    fn is_running(&self, pid: u32) -> ResetResult<bool> {
        Ok(self.running().contains(&pid))
    }

    fn stop_service(&self, name: &str) -> ResetResult<()> {
        self.calls.borrow_mut().push(HostCall::StopService(name.into()));
        if self.fail_service {
            return Err(ResetError::tool("powershell", "service not installed"));
        }
        Ok(())
    }

    fn run_hidden(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> ResetResult<Option<i32>> {
        self.calls.borrow_mut().push(HostCall::RunHidden(
            program.into(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        Ok(Some(0))
    }

    fn spawn_detached(&self, path: &Path) -> ResetResult<()> {
        self.calls.borrow_mut().push(HostCall::Spawn(path.to_path_buf()));
        if self.fail_spawn {
            return Err(ResetError::io(
                format!("failed to start {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            ));
        }
        Ok(())
    }

    fn has_elevated_privileges(&self) -> bool {
        true
    }
}

/// Operator with a fixed answer that records what it was asked.
pub struct ScriptedOperator {
    pub answer: bool,
    pub prompts: RefCell<Vec<String>>,
    pub installs: RefCell<Vec<PathBuf>>,
}

impl ScriptedOperator {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: RefCell::new(Vec::new()),
            installs: RefCell::new(Vec::new()),
        }
    }
}

impl Operator for ScriptedOperator {
    fn confirm_continue(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer
    }

    fn await_install_done(&self, installer: &Path) {
        self.installs.borrow_mut().push(installer.to_path_buf());
    }
}

/// Config rooted in a temp dir, mirroring the real layout.
pub fn sandbox_config(root: &Path) -> ResetConfig {
    let app_data = root.join("AppData/Roaming/AnyDesk");
    let backup_dir = root.join("Downloads/anydesk_backup");
    let program_files = root.join("Program Files (x86)/AnyDesk");
    ResetConfig {
        live_config: app_data.join("user.conf"),
        backup_config: backup_dir.join("user.conf"),
        backup_dir,
        trace_dirs: vec![
            root.join("ProgramData/AnyDesk"),
            app_data,
            root.join("AppData/Local/AnyDesk"),
            program_files.clone(),
        ],
        default_executable: program_files.join("AnyDesk.exe"),
        installer_dir: root.join("Resources"),
        installer_pattern: "AnyDesk*.exe".into(),
        process_names: vec!["AnyDesk".into(), "AnyDesk_Service".into()],
        service_name: "AnyDesk".into(),
        kill_timeout: Duration::from_millis(200),
        command_timeout: Duration::from_millis(200),
        installer_settle: Duration::ZERO,
        assume_yes: false,
    }
}

pub fn drain(rx: &mut UnboundedReceiver<LogEvent>) -> Vec<LogEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

pub fn messages_at(events: &[LogEvent], level: LogLevel) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.level == level)
        .map(|e| e.message.clone())
        .collect()
}
