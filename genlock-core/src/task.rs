//! Resolved task definitions.

use serde::{Deserialize, Serialize};

use crate::command_validator::CommandValidator;
use crate::error::{Error, Result};

/// A task as handed to the orchestrator: everything is already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub prompt: String,
    pub sources: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub runner_command: String,
}

impl TaskSpec {
    /// Rejects a task that could only ever silently do nothing.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidTask {
                task: self.name.clone(),
                message: "task name cannot be empty".to_string(),
            });
        }
        if self.sources.is_empty() {
            return Err(Error::InvalidTask {
                task: self.name.clone(),
                message: "no source patterns configured".to_string(),
            });
        }
        if let Some(blank) = self
            .sources
            .iter()
            .chain(self.exclude.iter())
            .find(|p| p.trim().is_empty())
        {
            return Err(Error::InvalidTask {
                task: self.name.clone(),
                message: format!("blank glob pattern '{}'", blank),
            });
        }
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidTask {
                task: self.name.clone(),
                message: "prompt cannot be empty".to_string(),
            });
        }
        CommandValidator::new().validate(&self.name, &self.runner_command)
    }
}
