//! Runner command validation.

use crate::error::{Error, Result};

/// Placeholder substituted with the shell-quoted prompt payload.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Validates runner command templates before any task runs.
#[derive(Debug, Clone, Default)]
pub struct CommandValidator;

impl CommandValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks that `command` is non-empty, single-line, free of NUL bytes
    /// and contains the prompt placeholder exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTask`] naming `task`.
    pub fn validate(&self, task: &str, command: &str) -> Result<()> {
        let invalid = |message: String| Error::InvalidTask {
            task: task.to_string(),
            message,
        };

        if command.trim().is_empty() {
            return Err(invalid("runner command cannot be empty".to_string()));
        }

        if command.contains('\0') {
            return Err(invalid("runner command contains a NUL byte".to_string()));
        }

        if command.contains('\n') || command.contains('\r') {
            return Err(invalid(
                "runner command must be a single line".to_string(),
            ));
        }

        match command.matches(PROMPT_PLACEHOLDER).count() {
            1 => Ok(()),
            0 => Err(invalid(format!(
                "runner command '{}' has no {} placeholder",
                command, PROMPT_PLACEHOLDER
            ))),
            n => Err(invalid(format!(
                "runner command '{}' has {} {} placeholders, expected one",
                command, n, PROMPT_PLACEHOLDER
            ))),
        }
    }
}
