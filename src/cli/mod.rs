//! CLI layer - Command-line interface

pub mod commands;
pub mod context;
pub mod output;

pub use commands::{parse_day, Cli, Commands};
pub use context::AppContext;
pub use output::{format_activity, format_feed, format_habit_list, format_settings};
