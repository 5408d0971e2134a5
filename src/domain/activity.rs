//! Activity aggregation
//!
//! Buckets memos into Monday-aligned calendar weeks and computes per-day
//! completion for the contribution grid, plus the success rate over a range.

use crate::domain::habits::{
    extract_completed_habits, habits_config_for_date, HabitConfig, HabitStatus,
    HabitsConfigEntry,
};
use crate::domain::habits::{build_config_timeline, build_daily_memo_index};
use crate::domain::memo::{DailyMemoInfo, Memo};
use crate::domain::mode::ActivityDisplayMode;
use crate::domain::range::{start_of_week, ActivityRange};
use chrono::{Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One cell of the contribution grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
    pub total_habits: u32,
    /// Always within `[0, 1]`
    pub completion_ratio: f64,
    pub habit_statuses: Vec<HabitStatus>,
    pub daily_memo: Option<DailyMemoInfo>,
    pub in_range: bool,
    pub is_clickable: bool,
}

/// Seven days starting on a Monday
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityWeek {
    pub start_date: NaiveDate,
    pub days: Vec<ContributionDay>,
    pub weekly_count: u32,
}

/// Weeks covering a range, ascending, with maxima for color scaling
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActivityWeekData {
    pub weeks: Vec<ActivityWeek>,
    pub max_daily: u32,
    pub max_weekly: u32,
}

impl ActivityWeekData {
    fn from_weeks(weeks: Vec<ActivityWeek>) -> Self {
        let max_daily = weeks
            .iter()
            .flat_map(|w| w.days.iter().map(|d| d.count))
            .max()
            .unwrap_or(0);
        let max_weekly = weeks.iter().map(|w| w.weekly_count).max().unwrap_or(0);
        ActivityWeekData {
            weeks,
            max_daily,
            max_weekly,
        }
    }

    pub fn days(&self) -> impl Iterator<Item = &ContributionDay> {
        self.weeks.iter().flat_map(|w| w.days.iter())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&ContributionDay> {
        self.days().find(|d| d.date == date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SuccessRateData {
    pub completed: u32,
    pub total: u32,
    pub rate: f64,
}

fn ratio(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Everything derived from one memo list that aggregation needs.
///
/// Built once per memo refresh and shared by every range computed from it.
#[derive(Debug, Clone)]
pub struct ActivitySnapshot {
    pub memos: Vec<Memo>,
    pub config_timeline: Vec<HabitsConfigEntry>,
    pub daily_memos: BTreeMap<NaiveDate, DailyMemoInfo>,
    pub offset: FixedOffset,
}

impl ActivitySnapshot {
    pub fn from_memos(memos: Vec<Memo>, offset: FixedOffset) -> Self {
        let config_timeline = build_config_timeline(&memos, &offset);
        let daily_memos = build_daily_memo_index(&memos, &offset);
        ActivitySnapshot {
            memos,
            config_timeline,
            daily_memos,
            offset,
        }
    }

    /// Date the first habit configuration took effect
    pub fn config_start_date(&self) -> Option<NaiveDate> {
        self.config_timeline.first().map(|entry| entry.date)
    }

    /// Habits in effect on `date`
    pub fn habits_for_date(&self, date: NaiveDate) -> &[HabitConfig] {
        habits_config_for_date(&self.config_timeline, date)
            .map(|entry| entry.habits.as_slice())
            .unwrap_or(&[])
    }

    pub fn build_week_data(
        &self,
        range: ActivityRange,
        mode: ActivityDisplayMode,
        today: NaiveDate,
    ) -> ActivityWeekData {
        build_activity_week_data(
            &self.config_timeline,
            &self.daily_memos,
            &self.memos,
            range,
            mode,
            today,
            &self.offset,
        )
    }
}

/// Build the contribution grid for `range`.
///
/// Weeks start on the Monday on or before the range start and keep going
/// until the range end is covered, so edge days may fall outside the range
/// (`in_range = false`).
pub fn build_activity_week_data(
    config_timeline: &[HabitsConfigEntry],
    daily_memos: &BTreeMap<NaiveDate, DailyMemoInfo>,
    memos: &[Memo],
    range: ActivityRange,
    mode: ActivityDisplayMode,
    today: NaiveDate,
    offset: &FixedOffset,
) -> ActivityWeekData {
    let bounds = range.bounds();
    let first_config_date = config_timeline.first().map(|entry| entry.date);

    let posts_by_date: HashMap<NaiveDate, u32> = match mode {
        ActivityDisplayMode::Posts => {
            let mut counts = HashMap::new();
            for memo in memos.iter().filter(|m| !m.is_habit_memo()) {
                if let Some(date) = memo.local_date(offset) {
                    *counts.entry(date).or_insert(0) += 1;
                }
            }
            counts
        }
        ActivityDisplayMode::Habits => HashMap::new(),
    };

    let mut weeks = Vec::new();
    let mut week_start = start_of_week(bounds.start);

    while week_start <= bounds.end {
        let days: Vec<ContributionDay> = (0..7)
            .map(|offset_days| {
                let date = week_start + Duration::days(offset_days);
                let mut day = match mode {
                    ActivityDisplayMode::Habits => {
                        habit_day(config_timeline, daily_memos.get(&date), date)
                    }
                    ActivityDisplayMode::Posts => {
                        let count = posts_by_date.get(&date).copied().unwrap_or(0);
                        empty_day(date, count)
                    }
                };
                day.in_range = bounds.contains(date);
                day.is_clickable =
                    date <= today && first_config_date.is_some_and(|first| date >= first);
                day
            })
            .collect();

        let weekly_count = days.iter().map(|d| d.count).sum();
        weeks.push(ActivityWeek {
            start_date: week_start,
            days,
            weekly_count,
        });

        week_start += Duration::days(7);
    }

    ActivityWeekData::from_weeks(weeks)
}

fn empty_day(date: NaiveDate, count: u32) -> ContributionDay {
    ContributionDay {
        date,
        count,
        total_habits: 0,
        completion_ratio: 0.0,
        habit_statuses: Vec::new(),
        daily_memo: None,
        in_range: false,
        is_clickable: false,
    }
}

fn habit_day(
    config_timeline: &[HabitsConfigEntry],
    daily_memo: Option<&DailyMemoInfo>,
    date: NaiveDate,
) -> ContributionDay {
    let habits = match habits_config_for_date(config_timeline, date) {
        Some(entry) if !entry.habits.is_empty() => &entry.habits,
        _ => {
            let mut day = empty_day(date, 0);
            day.daily_memo = daily_memo.cloned();
            return day;
        }
    };

    let tags: Vec<&str> = habits.iter().map(|h| h.tag.as_str()).collect();
    let signalled = daily_memo
        .map(|memo| extract_completed_habits(&memo.content, tags.iter().copied()))
        .unwrap_or_default();

    let statuses: Vec<HabitStatus> = habits
        .iter()
        .map(|habit| HabitStatus::from_config(habit, signalled.contains(&habit.tag)))
        .collect();

    // Only configured tags are ever signalled
    let completed = signalled.len() as u32;
    let total = habits.len() as u32;

    ContributionDay {
        date,
        count: completed,
        total_habits: total,
        completion_ratio: ratio(completed, total),
        habit_statuses: statuses,
        daily_memo: daily_memo.cloned(),
        in_range: false,
        is_clickable: false,
    }
}

/// Single-habit view of `week_data`: each day counts 0 or 1 for `habit_tag`.
pub fn activity_week_data_for_habit(week_data: &ActivityWeekData, habit_tag: &str) -> ActivityWeekData {
    let weeks = week_data
        .weeks
        .iter()
        .map(|week| {
            let days: Vec<ContributionDay> = week
                .days
                .iter()
                .map(|day| {
                    let statuses: Vec<HabitStatus> = day
                        .habit_statuses
                        .iter()
                        .filter(|s| s.tag == habit_tag)
                        .cloned()
                        .collect();
                    let count = statuses.iter().filter(|s| s.done).count() as u32;
                    let total = statuses.len() as u32;
                    ContributionDay {
                        date: day.date,
                        count,
                        total_habits: total,
                        completion_ratio: ratio(count, total),
                        habit_statuses: statuses,
                        daily_memo: day.daily_memo.clone(),
                        in_range: day.in_range,
                        is_clickable: day.is_clickable,
                    }
                })
                .collect();
            ActivityWeek {
                start_date: week.start_date,
                weekly_count: days.iter().map(|d| d.count).sum(),
                days,
            }
        })
        .collect();

    ActivityWeekData::from_weeks(weeks)
}

/// Completed over total habits across `range`, ignoring days after `today`
/// and days before the first configuration when it falls inside the range.
pub fn calculate_success_rate(
    week_data: &ActivityWeekData,
    range: ActivityRange,
    today: NaiveDate,
    config_start_date: Option<NaiveDate>,
) -> SuccessRateData {
    let bounds = range.bounds();

    let effective_start = match config_start_date {
        Some(start) if bounds.contains(start) => bounds.start.max(start),
        _ => bounds.start,
    };
    let effective_end = bounds.end.min(today);

    let (completed, total) = week_data
        .days()
        .filter(|day| day.date >= effective_start && day.date <= effective_end)
        .filter(|day| day.total_habits > 0)
        .fold((0u32, 0u32), |(c, t), day| {
            (c + day.count, t + day.total_habits)
        });

    SuccessRateData {
        completed,
        total,
        rate: ratio(completed, total),
    }
}
