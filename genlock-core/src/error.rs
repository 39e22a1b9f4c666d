//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Config file not found: {0}. Run 'genlock init' to create one.")]
    ConfigNotFound(PathBuf),

    #[error("Invalid task '{task}': {message}")]
    InvalidTask { task: String, message: String },

    #[error("Task not found: {name}. Available tasks: {available}")]
    TaskNotFound { name: String, available: String },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to walk {root}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("Lockfile error for {path}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("Runner failed to start for task {task}: {message}")]
    RunnerSpawn { task: String, message: String },
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "genlock.toml".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
