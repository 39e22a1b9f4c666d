//! Per-task pipeline: resolve, hash, diff, run, record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::diff::{diff_task, TaskDiff};
use crate::error::Result;
use crate::hasher::{compute_merkle_root, hash_files, FileSet, MerkleRoot, SkippedFile};
use crate::lock::{Lock, LockStore, TaskLockEntry};
use crate::prompt::assemble_prompt;
use crate::resolver::{build_glob_set, resolve_files};
use crate::runner::Runner;
use crate::task::TaskSpec;

/// How an invocation treats stale tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Run stale tasks and record successes.
    Normal,
    /// Run every task with matched files, stale or not.
    Force,
    /// Show what would run.
    DryRun,
    /// Only report staleness.
    Status,
}

impl RunMode {
    /// Whether this mode may execute runners and write the lock.
    pub fn executes(self) -> bool {
        matches!(self, RunMode::Normal | RunMode::Force)
    }
}

/// What to do with a task once its diff is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Skip,
    ReportStatus,
    ReportDryRun,
    Run,
}

pub fn decide_action(mode: RunMode, diff: &TaskDiff) -> TaskAction {
    match (mode, diff.changed) {
        (RunMode::Status, _) => TaskAction::ReportStatus,
        (RunMode::DryRun, true) => TaskAction::ReportDryRun,
        (RunMode::DryRun, false) => TaskAction::Skip,
        (RunMode::Force, _) => TaskAction::Run,
        (RunMode::Normal, true) => TaskAction::Run,
        (RunMode::Normal, false) => TaskAction::Skip,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// The runner exited with a non-zero code.
    ExitCode { code: i32 },
    /// The runner could not be started.
    Spawn { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    NoFilesMatched,
    UpToDate,
    Status,
    DryRun { prompt: String },
    Succeeded,
    Failed { failure: RunFailure },
    /// Sources could not be resolved; the task never got to a diff.
    Errored { message: String },
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. } | TaskOutcome::Errored { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_hash: Option<MerkleRoot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<TaskDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

impl TaskReport {
    fn new(task: &str, outcome: TaskOutcome) -> Self {
        Self {
            task: task.to_string(),
            sources_hash: None,
            diff: None,
            skipped_files: Vec::new(),
            outcome,
        }
    }
}

/// Aggregate result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub tasks: Vec<TaskReport>,
    #[serde(skip)]
    pub lock: Lock,
    pub lock_written: bool,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(|t| t.outcome.is_failure())
    }

    pub fn failed_tasks(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.outcome.is_failure())
            .map(|t| t.task.as_str())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.outcome)).count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Drives tasks one after another against a single loaded lock.
pub struct Orchestrator<R: Runner> {
    root: PathBuf,
    runner: R,
    mode: RunMode,
}

impl<R: Runner> Orchestrator<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            root: root.into(),
            runner,
            mode: RunMode::Normal,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Loads the lock once, processes every task, writes the lock once.
    ///
    /// All tasks are validated before the first one runs. The lock is only
    /// written in executing modes and only when at least one task succeeded.
    pub fn run(&self, tasks: &[TaskSpec], store: &LockStore) -> Result<RunReport> {
        for task in tasks {
            task.validate()?;
            build_glob_set(&task.sources)?;
            build_glob_set(&task.exclude)?;
        }

        let lock = store.load()?;
        let (reports, updates) = self.process(tasks, &lock);

        let lock_written = self.mode.executes() && !updates.is_empty();
        let lock = lock.merged(updates);
        if lock_written {
            store.save(&lock)?;
        }

        Ok(RunReport {
            mode: self.mode,
            tasks: reports,
            lock,
            lock_written,
        })
    }

    /// Processes tasks against an in-memory lock without touching disk.
    ///
    /// Returns a report per task and the new entries of tasks that ran
    /// successfully.
    pub fn process(
        &self,
        tasks: &[TaskSpec],
        lock: &Lock,
    ) -> (Vec<TaskReport>, BTreeMap<String, TaskLockEntry>) {
        let mut reports = Vec::with_capacity(tasks.len());
        let mut updates = BTreeMap::new();

        for task in tasks {
            let (report, entry) = self.process_task(task, lock.entry(&task.name));
            if let Some(entry) = entry {
                updates.insert(task.name.clone(), entry);
            }
            reports.push(report);
        }

        (reports, updates)
    }

    pub fn process_task(
        &self,
        task: &TaskSpec,
        prior: Option<&TaskLockEntry>,
    ) -> (TaskReport, Option<TaskLockEntry>) {
        let paths = match resolve_files(&self.root, &task.sources, &task.exclude) {
            Ok(paths) => paths,
            Err(e) => {
                error!(task = %task.name, error = %e, "failed to resolve sources");
                let report = TaskReport::new(
                    &task.name,
                    TaskOutcome::Errored {
                        message: e.to_string(),
                    },
                );
                return (report, None);
            }
        };

        self.process_paths(task, &paths, prior)
    }

    /// Hashes, diffs and acts on an already resolved path list.
    ///
    /// Paths that can no longer be read are reported as skipped.
    pub fn process_paths(
        &self,
        task: &TaskSpec,
        paths: &[String],
        prior: Option<&TaskLockEntry>,
    ) -> (TaskReport, Option<TaskLockEntry>) {
        let (files, skipped) = hash_files(&self.root, paths);
        if files.is_empty() {
            info!(task = %task.name, "no files matched");
            let mut report = TaskReport::new(&task.name, TaskOutcome::NoFilesMatched);
            report.skipped_files = skipped;
            return (report, None);
        }

        let root = compute_merkle_root(&files);
        let diff = diff_task(&task.name, &files, &root, prior);
        let action = decide_action(self.mode, &diff);
        debug!(task = %task.name, ?action, changed = diff.changed, "decided action");

        let (outcome, entry) = match action {
            TaskAction::Skip => {
                info!(task = %task.name, "up to date");
                (TaskOutcome::UpToDate, None)
            }
            TaskAction::ReportStatus => (TaskOutcome::Status, None),
            TaskAction::ReportDryRun => {
                let prompt = self.payload(task, &diff);
                info!(task = %task.name, changed = diff.changed_files.len(), "would run");
                (TaskOutcome::DryRun { prompt }, None)
            }
            TaskAction::Run => self.execute(task, &diff, &root, &files),
        };

        let report = TaskReport {
            task: task.name.clone(),
            sources_hash: Some(root),
            diff: Some(diff),
            skipped_files: skipped,
            outcome,
        };
        (report, entry)
    }

    fn execute(
        &self,
        task: &TaskSpec,
        diff: &TaskDiff,
        root: &MerkleRoot,
        files: &FileSet,
    ) -> (TaskOutcome, Option<TaskLockEntry>) {
        let prompt = self.payload(task, diff);
        info!(
            task = %task.name,
            changed = diff.changed_files.len(),
            removed = diff.removed_files.len(),
            "running task"
        );

        match self.runner.run(&task.name, &task.runner_command, &prompt) {
            Ok(0) => {
                info!(task = %task.name, root = %root, "task succeeded");
                let entry = TaskLockEntry::new(root.clone(), files.clone());
                (TaskOutcome::Succeeded, Some(entry))
            }
            Ok(code) => {
                warn!(task = %task.name, code, "runner exited with failure, lock entry withheld");
                (
                    TaskOutcome::Failed {
                        failure: RunFailure::ExitCode { code },
                    },
                    None,
                )
            }
            Err(e) => {
                error!(task = %task.name, error = %e, "runner could not be started");
                (
                    TaskOutcome::Failed {
                        failure: RunFailure::Spawn {
                            message: e.to_string(),
                        },
                    },
                    None,
                )
            }
        }
    }

    /// With nothing listed as changed or removed (a forced run over
    /// unchanged sources, or a stale root in the lock), every current file is
    /// handed to the runner.
    fn payload(&self, task: &TaskSpec, diff: &TaskDiff) -> String {
        let changed = if diff.changed_files.is_empty() && diff.removed_files.is_empty() {
            &diff.current_files
        } else {
            &diff.changed_files
        };
        assemble_prompt(&task.prompt, changed, &diff.removed_files)
    }
}
