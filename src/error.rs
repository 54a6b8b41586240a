// Reader-internal failure taxonomy. Never crosses a reader boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Pseudo-file or sysfs entry missing/unreadable.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Spawn failure, non-zero exit, or timeout.
    #[error("{tool} failed: {reason}")]
    ToolInvocationFailed { tool: String, reason: String },

    /// Output did not have the expected shape.
    #[error("{source_name} parse failure: {reason}")]
    ParseFailure { source_name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn tool(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::ToolInvocationFailed {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseFailure {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
