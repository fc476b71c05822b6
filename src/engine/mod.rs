//! Leaf components of the reset sequence.
//!
//! Each component is tolerant of "already absent": a missing file, directory or
//! process is a no-op, never an error. They report through the shared
//! `EventLog` and touch the OS only through `ProcessHost`.

mod installer;
mod process;
mod traces;
mod vault;

pub use installer::Installer;
pub use process::ProcessController;
pub use traces::TraceRemover;
pub use vault::{ConfigVault, RestoreOutcome};
