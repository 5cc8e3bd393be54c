//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses the
//! aceteam-core execution logic. Commands return [`CommandError`] on every
//! fatal path; `main` prints it and exits with status 1.

pub mod config;
pub mod fabric;
pub mod init;
pub mod nodes;
pub mod run;
pub mod validate;

use std::fmt;

use aceteam_core::{AceError, ClassifiedError};

/// A fatal command outcome: a message plus an optional one-line remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub message: String,
    pub suggestion: Option<String>,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AceError> for CommandError {
    fn from(err: AceError) -> Self {
        Self {
            suggestion: err.suggestion(),
            message: err.to_string(),
        }
    }
}

impl From<ClassifiedError> for CommandError {
    fn from(err: ClassifiedError) -> Self {
        Self {
            message: err.message,
            suggestion: err.suggestion,
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub type CommandResult = Result<(), CommandError>;

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ace_error_keeps_suggestion() {
        let err: CommandError = AceError::RuntimeNotFound("nothing on PATH".to_string()).into();
        assert!(err.message.contains("nothing on PATH"));
        assert!(err.suggestion.unwrap().contains("aceteam init"));
    }

    #[test]
    fn test_from_classified_error() {
        let err: CommandError = aceteam_core::classify("Request timed out after 30s").into();
        assert_eq!(err.message, "The request timed out");
        assert!(err.suggestion.is_some());
    }
}
