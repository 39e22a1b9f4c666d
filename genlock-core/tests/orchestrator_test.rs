use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use genlock_core::hasher::{compute_merkle_root, hash_file, FileDigest, FileSet};
use genlock_core::lock::LockStore;
use genlock_core::orchestrator::{Orchestrator, RunFailure, RunMode, TaskOutcome};
use genlock_core::prompt::parse_prompt;
use genlock_core::runner::Runner;
use genlock_core::task::TaskSpec;
use genlock_core::{Error, Result};
use tempfile::TempDir;

/// Records every invocation and answers with a per-task exit code.
#[derive(Default)]
struct FakeRunner {
    calls: RefCell<Vec<(String, String)>>,
    exit_codes: HashMap<String, i32>,
    unstartable: Vec<String>,
}

impl FakeRunner {
    fn failing(task: &str, code: i32) -> Self {
        let mut runner = Self::default();
        runner.exit_codes.insert(task.to_string(), code);
        runner
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Runner for FakeRunner {
    fn run(&self, task: &str, _command: &str, prompt: &str) -> Result<i32> {
        if self.unstartable.iter().any(|t| t == task) {
            return Err(Error::RunnerSpawn {
                task: task.to_string(),
                message: "No such file or directory".to_string(),
            });
        }
        self.calls
            .borrow_mut()
            .push((task.to_string(), prompt.to_string()));
        Ok(self.exit_codes.get(task).copied().unwrap_or(0))
    }
}

fn task(name: &str, sources: &[&str]) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        prompt: format!("Regenerate {}.", name),
        sources: sources.iter().map(|s| s.to_string()).collect(),
        exclude: vec![],
        runner_command: "llm {prompt}".to_string(),
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/one.md", "# one");
        write(dir.path(), "src/two.md", "# two");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn store(&self) -> LockStore {
        LockStore::new(self.root().join("genlock.lock"))
    }

    fn lock_bytes(&self) -> Option<Vec<u8>> {
        fs::read(self.root().join("genlock.lock")).ok()
    }
}

#[test]
fn test_first_run_runs_and_records_root() {
    let fx = Fixture::new();
    let runner = FakeRunner::default();
    let tasks = vec![task("docs", &["src/*.md"])];

    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    let docs = &report.tasks[0];
    assert_eq!(docs.outcome, TaskOutcome::Succeeded);
    let diff = docs.diff.as_ref().unwrap();
    assert_eq!(diff.changed_files, vec!["src/one.md", "src/two.md"]);
    assert!(diff.removed_files.is_empty());
    assert_eq!(runner.call_count(), 1);

    let mut expected = FileSet::new();
    for rel in ["src/one.md", "src/two.md"] {
        expected.insert(rel.to_string(), hash_file(fx.root().join(rel)).unwrap());
    }
    let lock = fx.store().load().unwrap();
    let entry = lock.entry("docs").unwrap();
    assert_eq!(entry.sources_hash, compute_merkle_root(&expected));
    assert_eq!(entry.files, expected);
    assert!(report.lock_written);
}

#[test]
fn test_prompt_carries_task_prompt_and_changed_files() {
    let fx = Fixture::new();
    let runner = FakeRunner::default();
    let tasks = vec![task("docs", &["src/*.md"])];

    Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    let (name, prompt) = &runner.calls()[0];
    assert_eq!(name, "docs");
    let parsed = parse_prompt(prompt).unwrap();
    assert_eq!(parsed.prompt, "Regenerate docs.");
    assert_eq!(parsed.changed_files, vec!["src/one.md", "src/two.md"]);
}

#[test]
fn test_second_run_without_edits_is_noop() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];

    let first_runner = FakeRunner::default();
    Orchestrator::new(fx.root(), &first_runner)
        .run(&tasks, &fx.store())
        .unwrap();
    let before = fx.lock_bytes().unwrap();

    let runner = FakeRunner::default();
    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    assert_eq!(report.tasks[0].outcome, TaskOutcome::UpToDate);
    assert!(!report.tasks[0].diff.as_ref().unwrap().changed);
    assert_eq!(runner.call_count(), 0);
    assert!(!report.lock_written);
    assert_eq!(fx.lock_bytes().unwrap(), before);
}

#[test]
fn test_edit_reports_only_that_file() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"]), task("other", &["notes/*.txt"])];
    write(fx.root(), "notes/a.txt", "note");

    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();
    let other_before = fx.store().load().unwrap().entry("other").cloned().unwrap();

    write(fx.root(), "src/two.md", "# two, edited");
    let runner = FakeRunner::default();
    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    let diff = report.tasks[0].diff.as_ref().unwrap();
    assert_eq!(diff.changed_files, vec!["src/two.md"]);
    assert!(diff.removed_files.is_empty());
    assert_eq!(report.tasks[1].outcome, TaskOutcome::UpToDate);
    assert_eq!(runner.call_count(), 1);

    let lock = fx.store().load().unwrap();
    assert_eq!(lock.entry("other").unwrap(), &other_before);
    assert_eq!(
        lock.entry("docs").unwrap().files["src/two.md"],
        hash_file(fx.root().join("src/two.md")).unwrap()
    );
}

#[test]
fn test_deleted_file_is_reported_removed() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();

    fs::remove_file(fx.root().join("src/one.md")).unwrap();
    let runner = FakeRunner::default();
    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    let diff = report.tasks[0].diff.as_ref().unwrap();
    assert!(diff.changed);
    assert!(diff.changed_files.is_empty());
    assert_eq!(diff.removed_files, vec!["src/one.md"]);

    let parsed = parse_prompt(&runner.calls()[0].1).unwrap();
    assert_eq!(parsed.removed_files, vec!["src/one.md"]);
}

#[test]
fn test_failure_is_isolated_from_sibling() {
    let fx = Fixture::new();
    write(fx.root(), "api/spec.yaml", "openapi: 3.0.0");
    let tasks = vec![task("docs", &["src/*.md"]), task("api", &["api/*.yaml"])];

    let runner = FakeRunner::failing("docs", 2);
    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    assert_eq!(
        report.tasks[0].outcome,
        TaskOutcome::Failed {
            failure: RunFailure::ExitCode { code: 2 }
        }
    );
    assert_eq!(report.tasks[1].outcome, TaskOutcome::Succeeded);
    assert!(report.has_failures());
    assert_eq!(report.failed_tasks(), vec!["docs"]);
    assert_eq!(report.exit_code(), 1);

    let lock = fx.store().load().unwrap();
    assert!(lock.entry("docs").is_none());
    assert!(lock.entry("api").is_some());
}

#[test]
fn test_failed_run_keeps_previous_entry() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();
    let before = fx.store().load().unwrap().entry("docs").cloned().unwrap();

    write(fx.root(), "src/one.md", "# one, edited");
    let report = Orchestrator::new(fx.root(), FakeRunner::failing("docs", 1))
        .run(&tasks, &fx.store())
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(fx.store().load().unwrap().entry("docs").unwrap(), &before);
}

#[test]
fn test_unstartable_runner_is_task_failure() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    let runner = FakeRunner {
        unstartable: vec!["docs".to_string()],
        ..FakeRunner::default()
    };

    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    assert!(matches!(
        report.tasks[0].outcome,
        TaskOutcome::Failed {
            failure: RunFailure::Spawn { .. }
        }
    ));
    assert!(fx.lock_bytes().is_none());
}

#[test]
fn test_rename_with_identical_content() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();
    let old_root = fx.store().load().unwrap().entry("docs").unwrap().sources_hash.clone();

    fs::rename(fx.root().join("src/one.md"), fx.root().join("src/uno.md")).unwrap();
    let report = Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();

    let docs = &report.tasks[0];
    assert_ne!(docs.sources_hash.as_ref().unwrap(), &old_root);
    let diff = docs.diff.as_ref().unwrap();
    assert_eq!(diff.changed_files, vec!["src/uno.md"]);
    assert_eq!(diff.removed_files, vec!["src/one.md"]);
}

#[test]
fn test_status_and_dry_run_never_execute_or_write() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];

    for mode in [RunMode::Status, RunMode::DryRun] {
        let runner = FakeRunner::default();
        let report = Orchestrator::new(fx.root(), &runner)
            .with_mode(mode)
            .run(&tasks, &fx.store())
            .unwrap();

        assert_eq!(runner.call_count(), 0);
        assert!(!report.lock_written);
        assert!(fx.lock_bytes().is_none());
        assert!(report.tasks[0].diff.as_ref().unwrap().changed);
    }
}

#[test]
fn test_dry_run_shows_prompt() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];

    let report = Orchestrator::new(fx.root(), FakeRunner::default())
        .with_mode(RunMode::DryRun)
        .run(&tasks, &fx.store())
        .unwrap();

    match &report.tasks[0].outcome {
        TaskOutcome::DryRun { prompt } => {
            let parsed = parse_prompt(prompt).unwrap();
            assert_eq!(parsed.changed_files, vec!["src/one.md", "src/two.md"]);
        }
        other => panic!("expected dry run, got {:?}", other),
    }
}

#[test]
fn test_force_runs_unchanged_task_with_all_files() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();

    let runner = FakeRunner::default();
    let report = Orchestrator::new(fx.root(), &runner)
        .with_mode(RunMode::Force)
        .run(&tasks, &fx.store())
        .unwrap();

    assert_eq!(report.tasks[0].outcome, TaskOutcome::Succeeded);
    let parsed = parse_prompt(&runner.calls()[0].1).unwrap();
    assert_eq!(parsed.changed_files, vec!["src/one.md", "src/two.md"]);
}

#[test]
fn test_no_files_matched_is_not_a_failure() {
    let fx = Fixture::new();
    let tasks = vec![task("empty", &["nothing/**/*.md"])];
    let runner = FakeRunner::default();

    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    assert_eq!(report.tasks[0].outcome, TaskOutcome::NoFilesMatched);
    assert!(report.tasks[0].diff.is_none());
    assert!(!report.has_failures());
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_untouched_task_entries_survive() {
    let fx = Fixture::new();
    write(fx.root(), "api/spec.yaml", "openapi: 3.0.0");
    let all = vec![task("docs", &["src/*.md"]), task("api", &["api/*.yaml"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&all, &fx.store())
        .unwrap();
    let api_before = fx.store().load().unwrap().entry("api").cloned().unwrap();

    write(fx.root(), "src/one.md", "# one, edited");
    write(fx.root(), "api/spec.yaml", "openapi: 3.1.0");
    let only_docs = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&only_docs, &fx.store())
        .unwrap();

    assert_eq!(fx.store().load().unwrap().entry("api").unwrap(), &api_before);
}

#[test]
fn test_invalid_task_fails_before_any_run() {
    let fx = Fixture::new();
    let mut broken = task("broken", &["src/*.md"]);
    broken.sources.clear();
    let tasks = vec![task("docs", &["src/*.md"]), broken];
    let runner = FakeRunner::default();

    let err = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap_err();

    assert!(err.to_string().contains("broken"));
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_corrupt_lock_heals_on_success() {
    let fx = Fixture::new();
    fs::write(fx.root().join("genlock.lock"), "not json at all").unwrap();
    let tasks = vec![task("docs", &["src/*.md"])];

    let report = Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();

    assert_eq!(report.tasks[0].outcome, TaskOutcome::Succeeded);
    assert!(fx.store().load().unwrap().entry("docs").is_some());
}

#[test]
fn test_stale_root_without_file_difference_sends_all_files() {
    let fx = Fixture::new();
    let tasks = vec![task("docs", &["src/*.md"])];
    Orchestrator::new(fx.root(), FakeRunner::default())
        .run(&tasks, &fx.store())
        .unwrap();

    let mut lock = fx.store().load().unwrap();
    let entry = lock.tasks.get_mut("docs").unwrap();
    entry.sources_hash = FileDigest::from("sha256:0000");
    fx.store().save(&lock).unwrap();

    let runner = FakeRunner::default();
    let report = Orchestrator::new(fx.root(), &runner)
        .run(&tasks, &fx.store())
        .unwrap();

    let diff = report.tasks[0].diff.as_ref().unwrap();
    assert!(diff.changed);
    assert!(diff.changed_files.is_empty());
    assert!(diff.removed_files.is_empty());

    let parsed = parse_prompt(&runner.calls()[0].1).unwrap();
    assert_eq!(parsed.changed_files, vec!["src/one.md", "src/two.md"]);
    assert_eq!(
        fx.store().load().unwrap().entry("docs").unwrap().sources_hash,
        report.tasks[0].sources_hash.clone().unwrap()
    );
}

#[test]
fn test_resolution_error_is_task_local() {
    let fx = Fixture::new();
    let orchestrator = Orchestrator::new(fx.root(), FakeRunner::default());
    let broken = task("broken", &["src/[*.md"]);

    let (report, entry) = orchestrator.process_task(&broken, None);
    assert!(matches!(report.outcome, TaskOutcome::Errored { ref message } if message.contains("src/[")));
    assert!(report.outcome.is_failure());
    assert!(report.diff.is_none());
    assert!(entry.is_none());
    assert_eq!(orchestrator.runner().call_count(), 0);

    let (sibling, sibling_entry) = orchestrator.process_task(&task("docs", &["src/*.md"]), None);
    assert_eq!(sibling.outcome, TaskOutcome::Succeeded);
    assert!(sibling_entry.is_some());
}

#[test]
fn test_file_vanished_after_resolution_is_skipped() {
    let fx = Fixture::new();
    let orchestrator = Orchestrator::new(fx.root(), FakeRunner::default());
    let docs = task("docs", &["src/*.md"]);
    let paths = vec!["src/gone.md".to_string(), "src/one.md".to_string()];

    let (report, entry) = orchestrator.process_paths(&docs, &paths, None);

    assert_eq!(report.outcome, TaskOutcome::Succeeded);
    assert_eq!(report.skipped_files.len(), 1);
    assert_eq!(report.skipped_files[0].path, "src/gone.md");
    assert_eq!(report.diff.as_ref().unwrap().current_files, vec!["src/one.md"]);
    let entry = entry.unwrap();
    assert_eq!(entry.files.keys().collect::<Vec<_>>(), vec!["src/one.md"]);

    let parsed = parse_prompt(&orchestrator.runner().calls()[0].1).unwrap();
    assert_eq!(parsed.changed_files, vec!["src/one.md"]);
}

#[test]
fn test_every_file_vanished_is_no_files_matched() {
    let fx = Fixture::new();
    let orchestrator = Orchestrator::new(fx.root(), FakeRunner::default());
    let paths = vec!["src/gone.md".to_string()];

    let (report, entry) = orchestrator.process_paths(&task("docs", &["src/*.md"]), &paths, None);

    assert_eq!(report.outcome, TaskOutcome::NoFilesMatched);
    assert_eq!(report.skipped_files.len(), 1);
    assert!(entry.is_none());
    assert_eq!(orchestrator.runner().call_count(), 0);
}
