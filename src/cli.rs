pub mod commands;

pub use commands::{Cli, Commands, execute_list_command, execute_report_command};
