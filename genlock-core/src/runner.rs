//! Invocation of the external generation command.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::command_validator::PROMPT_PLACEHOLDER;
use crate::error::{Error, Result};

/// Exit code reported when the runner was killed by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Executes a runner command with an assembled prompt.
///
/// Implementations block until the program exits and return its exit code.
/// An `Err` means the program could not be started at all.
pub trait Runner {
    fn run(&self, task: &str, command: &str, prompt: &str) -> Result<i32>;
}

impl<T: Runner + ?Sized> Runner for &T {
    fn run(&self, task: &str, command: &str, prompt: &str) -> Result<i32> {
        (**self).run(task, command, prompt)
    }
}

/// Substitutes the shell-quoted prompt into the command template.
pub fn render_command(command: &str, prompt: &str) -> String {
    command.replacen(PROMPT_PLACEHOLDER, &shell_words::quote(prompt), 1)
}

/// Runs the rendered command through `sh -c` with inherited stdio, so
/// interactive programs work unchanged.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: None,
        }
    }

    /// Runs commands from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Runner for ShellRunner {
    fn run(&self, task: &str, command: &str, prompt: &str) -> Result<i32> {
        let rendered = render_command(command, prompt);
        info!(task, command, "invoking runner");
        debug!(task, rendered = %rendered, "rendered runner command");

        let mut cmd = Command::new(&self.shell);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        let status = cmd
            .arg("-c")
            .arg(&rendered)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Error::RunnerSpawn {
                task: task.to_string(),
                message: format!("Failed to start '{}': {}", self.shell, e),
            })?;

        let code = status.code().unwrap_or(SIGNALED_EXIT_CODE);
        debug!(task, code, "runner exited");
        Ok(code)
    }
}
