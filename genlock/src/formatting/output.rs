//! General output formatting utilities.

use std::time::Duration;

use owo_colors::OwoColorize;

/// Prints a boxed summary with keys padded to a common width.
pub fn print_summary_box(title: &str, items: &[(&str, String)]) {
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    println!(
        "┌─ {} {}",
        title.cyan().bold(),
        "─".repeat(50).bright_black()
    );
    for (key, value) in items {
        println!(
            "│ {} {}",
            format!("{:<width$}", key, width = width).bright_black().bold(),
            value.bold().white()
        );
    }
    println!("└{}", "─".repeat(60).bright_black());
}

pub fn print_key_value(key: &str, value: &str) {
    println!("  {} {}", key.bright_black().bold(), value.bold().white());
}

/// Prints changed (`+`) or removed (`-`) paths under a task line.
pub fn print_file_list(files: &[String], marker: char) {
    let marker = match marker {
        '-' => "-".red().to_string(),
        other => other.green().to_string(),
    };
    for file in files {
        println!("      {} {}", marker, file);
    }
}

pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if elapsed.as_secs() < 60 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        let secs = elapsed.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
