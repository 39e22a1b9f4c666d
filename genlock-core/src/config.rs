//! TOML configuration parsing for `genlock.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::task::TaskSpec;

pub const DEFAULT_CONFIG_FILE: &str = "genlock.toml";

/// Written by `genlock init`.
pub const STARTER_CONFIG: &str = r#"# genlock configuration
#
# Each task runs its runner command only when its sources changed since the
# last successful run. `{prompt}` is replaced with the assembled prompt.

[runner]
command = "claude -p {prompt}"

[tasks.docs]
prompt = "Update the documentation in docs/ to match the changed sources."
sources = ["src/**/*.rs"]
exclude = ["src/generated/**"]
"#;

/// A glob list that may be written as a single string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PatternValue {
    One(String),
    Many(Vec<String>),
}

fn deserialize_patterns<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PatternValue::deserialize(deserializer)? {
        PatternValue::One(pattern) => vec![pattern],
        PatternValue::Many(patterns) => patterns,
    })
}

/// Default runner shared by all tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    pub command: Option<String>,
}

/// One `[tasks.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub prompt: String,
    #[serde(deserialize_with = "deserialize_patterns")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_patterns")]
    pub exclude: Vec<String>,
    /// Overrides `[runner].command` for this task.
    pub runner: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Tasks in document order.
    #[serde(default)]
    pub tasks: IndexMap<String, TaskConfig>,
    /// Path the config was loaded from (for resolving relative paths).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Config {
    pub fn parse(text: &str, context: &str) -> Result<Config> {
        toml::from_str(text).map_err(|error| Error::Toml {
            error,
            context: context.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| Error::PathIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text, &path.display().to_string())?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory globs are resolved against: the config's directory, or `.`.
    pub fn root_dir(&self) -> PathBuf {
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Resolves every task, in document order, validating each.
    pub fn to_tasks(&self) -> Result<Vec<TaskSpec>> {
        self.tasks
            .iter()
            .map(|(name, task)| self.resolve_task(name, task))
            .collect()
    }

    /// Resolves only `names`, keeping config order. Empty means all.
    pub fn select_tasks(&self, names: &[String]) -> Result<Vec<TaskSpec>> {
        if names.is_empty() {
            return self.to_tasks();
        }
        if let Some(missing) = names.iter().find(|n| !self.tasks.contains_key(n.as_str())) {
            return Err(Error::TaskNotFound {
                name: missing.clone(),
                available: self.task_names().join(", "),
            });
        }
        self.tasks
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n == *name))
            .map(|(name, task)| self.resolve_task(name, task))
            .collect()
    }

    fn resolve_task(&self, name: &str, task: &TaskConfig) -> Result<TaskSpec> {
        let runner_command = task
            .runner
            .clone()
            .or_else(|| self.runner.command.clone())
            .ok_or_else(|| Error::InvalidTask {
                task: name.to_string(),
                message: "no runner command: set [runner].command or tasks.<name>.runner"
                    .to_string(),
            })?;

        let spec = TaskSpec {
            name: name.to_string(),
            prompt: task.prompt.clone(),
            sources: task.sources.clone(),
            exclude: task.exclude.clone(),
            runner_command,
        };
        spec.validate()?;
        Ok(spec)
    }
}
