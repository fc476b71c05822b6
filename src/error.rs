//! Error taxonomy for the reset sequence.
//!
//! Only `UserCancelled` is allowed to escape a step; everything else is turned
//! into a `Failed` step outcome (or swallowed, for benign variants) at the step
//! boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResetError {
    /// A file, directory or process that was expected is absent.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Copy, delete or launch failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Raised only at the missing-installer decision point.
    #[error("user cancelled: {0}")]
    UserCancelled(String),

    /// A service or process command returned non-zero or could not be run.
    #[error("external tool `{tool}` failed: {message}")]
    ExternalTool { tool: String, message: String },
}

impl ResetError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ResetError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ResetError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ResetError::UserCancelled(_))
    }

    /// Benign errors are logged at info level and never fail a step.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ResetError::NotFound(_) | ResetError::ExternalTool { .. }
        )
    }
}

pub type ResetResult<T> = Result<T, ResetError>;
