//! Habit configuration types and the config timeline

use crate::domain::memo::Memo;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Color assigned when a config line carries none (opaque material green)
pub const DEFAULT_HABIT_COLOR: u32 = 0xFF4C_AF50;

/// One trackable habit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitConfig {
    /// Normalized `#habits/<slug>` identifier
    pub tag: String,
    pub label: String,
    /// ARGB color
    pub color: u32,
}

impl HabitConfig {
    pub fn new(tag: impl Into<String>, label: impl Into<String>, color: u32) -> Self {
        HabitConfig {
            tag: tag.into(),
            label: label.into(),
            color,
        }
    }

    /// `#RRGGBB` form of the color, alpha dropped
    pub fn color_hex(&self) -> String {
        format!("#{:06X}", self.color & 0x00FF_FFFF)
    }
}

/// A habit set that took effect on `date`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitsConfigEntry {
    pub date: NaiveDate,
    pub habits: Vec<HabitConfig>,
    pub source_memo: Memo,
}

impl HabitsConfigEntry {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.habits.iter().map(|h| h.tag.as_str())
    }

    /// Sort key used for ordering the timeline
    pub(crate) fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.source_memo.timestamp()
    }
}

/// Completion state of one habit on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStatus {
    pub tag: String,
    pub label: String,
    pub color: u32,
    pub done: bool,
}

impl HabitStatus {
    pub fn from_config(habit: &HabitConfig, done: bool) -> Self {
        HabitStatus {
            tag: habit.tag.clone(),
            label: habit.label.clone(),
            color: habit.color,
            done,
        }
    }
}

/// Latest entry whose `date <= target`, or `None` if every entry postdates it.
///
/// `timeline` must be sorted ascending by date.
pub fn habits_config_for_date(
    timeline: &[HabitsConfigEntry],
    target: NaiveDate,
) -> Option<&HabitsConfigEntry> {
    let idx = timeline.partition_point(|entry| entry.date <= target);
    idx.checked_sub(1).map(|i| &timeline[i])
}
