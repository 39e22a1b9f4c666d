//! Table formatting utilities using comfy-table.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use genlock_core::TaskSpec;

/// Prints configured tasks with their patterns and runner.
pub fn print_task_table(tasks: &[TaskSpec]) {
    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Sources").add_attribute(Attribute::Bold),
            Cell::new("Exclude").add_attribute(Attribute::Bold),
            Cell::new("Runner").add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for task in tasks {
        let exclude = if task.exclude.is_empty() {
            "-".to_string()
        } else {
            task.exclude.join("\n")
        };
        table.add_row(vec![
            Cell::new(&task.name).fg(Color::White),
            Cell::new(task.sources.join("\n")).fg(Color::Cyan),
            Cell::new(exclude).fg(Color::DarkGrey),
            Cell::new(&task.runner_command).fg(Color::DarkGrey),
        ]);
    }

    println!("{}", table);
}
