//! Run log delivery and diagnostic tracing setup.
//!
//! `EventLog` is the only channel from the reset sequence to whatever presents
//! it. Events are delivered in send order over an unbounded channel, so the
//! sequence never blocks on the presentation side.

use crate::model::{LogEvent, LogLevel};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct EventLog {
    tx: UnboundedSender<LogEvent>,
}

impl EventLog {
    pub fn channel() -> (Self, UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel::<LogEvent>();
        (Self { tx }, rx)
    }

    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        // Receiver gone means nobody is watching anymore; the run carries on.
        let _ = self.tx.send(LogEvent::new(level, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LogLevel::Success, message);
    }
}

/// Install the stderr diagnostics subscriber. `RUST_LOG` overrides the default `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
