//! Lockfile persistence.
//!
//! The lock records, per task, the file set that was last handed to a runner
//! which exited successfully. It is read once per invocation, updated in
//! memory, and written back once.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::hasher::{FileSet, MerkleRoot};

pub const LOCK_VERSION: u32 = 1;
pub const DEFAULT_LOCK_FILE: &str = "genlock.lock";

/// State of one task as of its last successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLockEntry {
    pub last_run: String,
    pub sources_hash: MerkleRoot,
    pub files: FileSet,
}

impl TaskLockEntry {
    /// Creates an entry stamped with the current UTC time.
    pub fn new(sources_hash: MerkleRoot, files: FileSet) -> Self {
        Self {
            last_run: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            sources_hash,
            files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub version: u32,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskLockEntry>,
}

impl Default for Lock {
    fn default() -> Self {
        Self {
            version: LOCK_VERSION,
            tasks: BTreeMap::new(),
        }
    }
}

impl Lock {
    pub fn entry(&self, task: &str) -> Option<&TaskLockEntry> {
        self.tasks.get(task)
    }

    /// Returns a new lock holding every existing entry, overlaid with `updates`.
    pub fn merged(&self, updates: BTreeMap<String, TaskLockEntry>) -> Lock {
        let mut tasks = self.tasks.clone();
        tasks.extend(updates);
        Lock {
            version: LOCK_VERSION,
            tasks,
        }
    }

    /// Stable, human-diffable JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self).map_err(|e| Error::Lock {
            path: PathBuf::from(DEFAULT_LOCK_FILE),
            message: format!("Failed to serialize lock: {}", e),
        })?;
        text.push('\n');
        Ok(text)
    }

    /// Parses raw lockfile bytes. Invalid UTF-8 is a parse error.
    pub fn from_json(bytes: &[u8]) -> std::result::Result<Lock, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Loads and stores the lock at a fixed path.
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the lock.
    ///
    /// A missing file is an empty lock. A malformed file or an unknown
    /// version is also an empty lock, with a warning; the next write
    /// replaces it.
    pub fn load(&self) -> Result<Lock> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no lockfile yet");
                return Ok(Lock::default());
            }
            Err(source) => {
                return Err(Error::PathIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match Lock::from_json(&bytes) {
            Ok(lock) if lock.version == LOCK_VERSION => {
                debug!(
                    path = %self.path.display(),
                    tasks = lock.tasks.len(),
                    "loaded lockfile"
                );
                Ok(lock)
            }
            Ok(lock) => {
                warn!(
                    path = %self.path.display(),
                    version = lock.version,
                    expected = LOCK_VERSION,
                    "unsupported lockfile version, treating as empty"
                );
                Ok(Lock::default())
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "malformed lockfile, treating as empty"
                );
                Ok(Lock::default())
            }
        }
    }

    pub fn save(&self, lock: &Lock) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| Error::PathIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let text = lock.to_json().map_err(|e| match e {
            Error::Lock { message, .. } => Error::Lock {
                path: self.path.clone(),
                message,
            },
            other => other,
        })?;
        fs::write(&self.path, text).map_err(|source| Error::PathIo {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), tasks = lock.tasks.len(), "wrote lockfile");
        Ok(())
    }
}
