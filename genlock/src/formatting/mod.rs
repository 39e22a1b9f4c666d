//! CLI formatting utilities.
//!
//! Consistent colors and layout for task reports. Everything here writes to
//! stdout; logs go to stderr.

mod headers;
mod output;
mod status;
mod tables;

pub use headers::{print_section_header, SectionStyle};
pub use output::{format_duration, print_file_list, print_key_value, print_summary_box};
pub use status::{print_error, print_success, print_task_line, print_warning, Status};
pub use tables::print_task_table;
