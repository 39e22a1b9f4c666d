//! Staleness detection against the lock.

use serde::Serialize;
use tracing::{debug, warn};

use crate::hasher::{FileSet, MerkleRoot};
use crate::lock::TaskLockEntry;

/// What moved in a task's sources since its last successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDiff {
    pub task: String,
    pub changed: bool,
    /// New files and files whose digest differs.
    pub changed_files: Vec<String>,
    /// Files recorded in the lock that are no longer resolved.
    pub removed_files: Vec<String>,
    pub current_files: Vec<String>,
}

/// Compares the current file set of `task` to its prior lock entry.
///
/// Equal roots short-circuit without looking at individual files. Only a
/// root mismatch pays for the per-file walk.
pub fn diff_task(
    task: &str,
    current: &FileSet,
    current_root: &MerkleRoot,
    prior: Option<&TaskLockEntry>,
) -> TaskDiff {
    let current_files: Vec<String> = current.keys().cloned().collect();

    let Some(prior) = prior else {
        debug!(task, files = current_files.len(), "no lock entry, every file is new");
        return TaskDiff {
            task: task.to_string(),
            changed: true,
            changed_files: current_files.clone(),
            removed_files: Vec::new(),
            current_files,
        };
    };

    if &prior.sources_hash == current_root {
        debug!(task, root = %current_root, "sources hash unchanged");
        return TaskDiff {
            task: task.to_string(),
            changed: false,
            changed_files: Vec::new(),
            removed_files: Vec::new(),
            current_files,
        };
    }

    let changed_files: Vec<String> = current
        .iter()
        .filter(|(path, digest)| prior.files.get(*path) != Some(*digest))
        .map(|(path, _)| path.clone())
        .collect();
    let removed_files: Vec<String> = prior
        .files
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();

    if changed_files.is_empty() && removed_files.is_empty() {
        warn!(
            task,
            stored = %prior.sources_hash,
            current = %current_root,
            "sources hash differs but no file differs, assuming changed"
        );
    } else {
        debug!(
            task,
            changed = changed_files.len(),
            removed = removed_files.len(),
            "sources hash differs"
        );
    }

    TaskDiff {
        task: task.to_string(),
        changed: true,
        changed_files,
        removed_files,
        current_files,
    }
}
