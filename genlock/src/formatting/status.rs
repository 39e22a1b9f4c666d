//! Task status markers and one-line messages.

use genlock_core::TaskOutcome;
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

impl Status {
    /// Marker for a task line. `changed` only matters for status reports.
    pub fn for_outcome(outcome: &TaskOutcome, changed: bool) -> Self {
        match outcome {
            TaskOutcome::Succeeded | TaskOutcome::UpToDate => Status::Success,
            TaskOutcome::Status if changed => Status::Warning,
            TaskOutcome::Status => Status::Success,
            TaskOutcome::NoFilesMatched | TaskOutcome::DryRun { .. } => Status::Info,
            TaskOutcome::Failed { .. } | TaskOutcome::Errored { .. } => Status::Error,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Error => "✗",
            Status::Warning => "⚠",
            Status::Info => "→",
        }
    }

    pub fn marker(self) -> String {
        match self {
            Status::Success => self.symbol().green().to_string(),
            Status::Error => self.symbol().red().to_string(),
            Status::Warning => self.symbol().yellow().to_string(),
            Status::Info => self.symbol().cyan().to_string(),
        }
    }

    fn paint(self, text: &str) -> String {
        match self {
            Status::Success => text.green().bold().to_string(),
            Status::Error => text.red().bold().to_string(),
            Status::Warning => text.yellow().bold().to_string(),
            Status::Info => text.cyan().to_string(),
        }
    }
}

/// Short label printed after the task name.
pub fn outcome_label(outcome: &TaskOutcome, changed: bool) -> String {
    match outcome {
        TaskOutcome::NoFilesMatched => "no files matched".bright_black().to_string(),
        TaskOutcome::UpToDate => "up to date".bright_black().to_string(),
        TaskOutcome::Status if changed => "changed".yellow().to_string(),
        TaskOutcome::Status => "up to date".bright_black().to_string(),
        TaskOutcome::DryRun { .. } => "would run".cyan().to_string(),
        TaskOutcome::Succeeded => "OK".green().to_string(),
        TaskOutcome::Failed { .. } => "FAILED".red().to_string(),
        TaskOutcome::Errored { .. } => "ERROR".red().to_string(),
    }
}

pub fn print_task_line(name: &str, outcome: &TaskOutcome, changed: bool) {
    println!(
        "  {} {} {}",
        Status::for_outcome(outcome, changed).marker(),
        name.bold().white(),
        outcome_label(outcome, changed)
    );
}

fn print_message(status: Status, message: &str) {
    println!("  {} {}", status.marker(), status.paint(message));
}

pub fn print_success(message: &str) {
    print_message(Status::Success, message);
}

pub fn print_error(message: &str) {
    print_message(Status::Error, message);
}

pub fn print_warning(message: &str) {
    print_message(Status::Warning, message);
}
