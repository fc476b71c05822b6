//! Reset orchestration.
//!
//! Owns the fixed nine-step sequence and the run state shared between steps.
//! Progress is reported through the event log only, so any presentation layer
//! (console, JSON lines) can sit on the other end of the channel.

mod controller;
mod steps;

pub(crate) use controller::ResetOrchestrator;
