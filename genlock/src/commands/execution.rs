//! Task execution and status commands.

use std::time::{Duration, Instant};

use anyhow::Result;
use genlock_core::{Orchestrator, RunFailure, RunMode, RunReport, ShellRunner, TaskOutcome, TaskReport};
use owo_colors::OwoColorize;

use crate::formatting::{
    format_duration, print_error, print_file_list, print_section_header, print_success,
    print_summary_box, print_task_line, print_warning, SectionStyle, Status,
};

use super::Context;

pub fn cmd_run(ctx: &Context, tasks: Vec<String>, force: bool, dry_run: bool) -> Result<i32> {
    let mode = match (force, dry_run) {
        (_, true) => RunMode::DryRun,
        (true, false) => RunMode::Force,
        (false, false) => RunMode::Normal,
    };

    let start = Instant::now();
    let report = run_mode(ctx, &tasks, mode)?;

    let title = if mode == RunMode::DryRun {
        "Run Plan (Dry Run)"
    } else {
        "Run Results"
    };
    print_section_header(title, SectionStyle::Primary);
    for task in &report.tasks {
        print_task_report(task);
    }
    println!();
    print_run_summary(&report, start.elapsed());

    Ok(report.exit_code())
}

pub fn cmd_status(ctx: &Context, tasks: Vec<String>, json: bool) -> Result<i32> {
    let report = run_mode(ctx, &tasks, RunMode::Status)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.tasks)?);
        return Ok(report.exit_code());
    }

    print_section_header("Task Status", SectionStyle::Primary);
    for task in &report.tasks {
        print_task_report(task);
    }
    println!();

    let stale = report
        .tasks
        .iter()
        .filter(|t| t.diff.as_ref().is_some_and(|d| d.changed))
        .count();
    if stale == 0 {
        print_success("All tasks up to date");
    } else {
        print_warning(&format!("{} of {} tasks need to run", stale, report.tasks.len()));
    }
    println!();

    Ok(report.exit_code())
}

fn run_mode(ctx: &Context, names: &[String], mode: RunMode) -> Result<RunReport> {
    let config = ctx.load_config()?;
    let tasks = config.select_tasks(names)?;
    let store = ctx.lock_store(&config);

    let root = config.root_dir();
    let runner = ShellRunner::new().in_dir(&root);
    let orchestrator = Orchestrator::new(root, runner).with_mode(mode);
    Ok(orchestrator.run(&tasks, &store)?)
}

fn print_task_report(report: &TaskReport) {
    let changed = report.diff.as_ref().is_some_and(|d| d.changed);
    print_task_line(&report.task, &report.outcome, changed);
    match &report.outcome {
        TaskOutcome::DryRun { prompt } => {
            for line in prompt.lines() {
                println!("      {}", line.bright_black());
            }
        }
        TaskOutcome::Failed { failure } => {
            let reason = match failure {
                RunFailure::ExitCode { code } => format!("runner exited with code {}", code),
                RunFailure::Spawn { message } => message.clone(),
            };
            println!("      {}", reason.bright_red());
        }
        TaskOutcome::Errored { message } => {
            println!("      {}", message.bright_red());
        }
        _ => {}
    }

    if let Some(diff) = &report.diff {
        if diff.changed && !matches!(report.outcome, TaskOutcome::DryRun { .. }) {
            print_file_list(&diff.changed_files, '+');
            print_file_list(&diff.removed_files, '-');
        }
    }
    for skipped in &report.skipped_files {
        println!(
            "      {} {} {}",
            Status::Warning.marker(),
            skipped.path,
            "(skipped, unreadable)".bright_black()
        );
    }
}

fn print_run_summary(report: &RunReport, elapsed: Duration) {
    let ran = report.count(|o| matches!(o, TaskOutcome::Succeeded | TaskOutcome::Failed { .. }));
    let failed = report.failed_tasks();
    let skipped = report.count(|o| matches!(o, TaskOutcome::UpToDate | TaskOutcome::NoFilesMatched));
    let planned = report.count(|o| matches!(o, TaskOutcome::DryRun { .. }));
    let lock_state = if report.lock_written { "updated" } else { "unchanged" };

    let mut items = if report.mode == RunMode::DryRun {
        vec![("Would run", planned.to_string())]
    } else {
        vec![("Ran", ran.to_string()), ("Failed", failed.len().to_string())]
    };
    items.push(("Up to date", skipped.to_string()));
    items.push(("Lockfile", lock_state.to_string()));
    items.push(("Duration", format_duration(elapsed)));
    print_summary_box("Summary", &items);
    println!();

    if failed.is_empty() {
        if report.mode != RunMode::DryRun {
            print_success("All tasks completed");
        }
    } else {
        print_error(&format!("Failed tasks: {}", failed.join(", ")));
    }
    println!();
}
