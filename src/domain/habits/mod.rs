//! Habit tracking encoded in memo text

pub mod config;
pub mod encoder;
pub mod parser;

// Re-export main types
pub use config::{
    habits_config_for_date, HabitConfig, HabitStatus, HabitsConfigEntry, DEFAULT_HABIT_COLOR,
};
pub use encoder::{build_daily_content, build_habits_config_content_from_list};
pub use parser::{
    build_config_timeline, build_daily_memo_index, extract_completed_habits, label_from_tag,
    normalize_habit_tag, parse_habit_config_line, parse_habits_config,
};
