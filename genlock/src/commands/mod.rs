//! Command implementations for the CLI.

mod execution;
mod info;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use genlock_core::{Config, LockStore, DEFAULT_LOCK_FILE};

pub use execution::{cmd_run, cmd_status};
pub use info::{cmd_hash, cmd_init, cmd_list};

/// Paths shared by every subcommand.
pub struct Context {
    config_path: PathBuf,
    lock_path: Option<PathBuf>,
}

impl Context {
    pub fn new(config_path: PathBuf, lock_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            lock_path,
        }
    }

    fn load_config(&self) -> Result<Config> {
        Config::load(&self.config_path)
            .with_context(|| format!("loading {}", self.config_path.display()))
    }

    /// The lock lives next to the config unless overridden.
    fn lock_store(&self, config: &Config) -> LockStore {
        match &self.lock_path {
            Some(path) => LockStore::new(path),
            None => LockStore::new(config.root_dir().join(DEFAULT_LOCK_FILE)),
        }
    }
}
