//! Output formatting utilities

use crate::application::SettingsState;
use crate::domain::habits::HabitConfig;
use crate::domain::{
    ActivityDisplayMode, ActivityRange, ActivityWeekData, AppMode, ContributionDay, Memo,
    SuccessRateData,
};
use chrono::{FixedOffset, NaiveDate};

const PREVIEW_CHARS: usize = 60;
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const HEAT: [char; 5] = ['.', '░', '▒', '▓', '█'];

/// Format memos newest first, one line each
pub fn format_feed(memos: &[Memo], offset: &FixedOffset) -> String {
    if memos.is_empty() {
        return "No memos found".to_string();
    }

    let mut output = String::new();
    for memo in memos {
        let when = memo
            .timestamp()
            .map(|ts| ts.with_timezone(offset).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| " ".repeat(16));
        output.push_str(&format!("{}  {}\n", when, memo.preview(PREVIEW_CHARS)));
    }
    output
}

/// Format a habit configuration as `Label  #habits/tag  #RRGGBB` lines
pub fn format_habit_list(habits: &[HabitConfig]) -> String {
    if habits.is_empty() {
        return "No habits configured".to_string();
    }

    let width = habits.iter().map(|h| h.label.chars().count()).max().unwrap_or(0);
    let mut output = String::new();
    for habit in habits {
        output.push_str(&format!(
            "{:<width$}  {}  {}\n",
            habit.label,
            habit.tag,
            habit.color_hex(),
            width = width
        ));
    }
    output
}

fn heat_level(day: &ContributionDay, max_daily: u32, mode: ActivityDisplayMode) -> char {
    let level = match mode {
        ActivityDisplayMode::Habits => {
            if day.total_habits == 0 {
                return ' ';
            }
            day.completion_ratio
        }
        ActivityDisplayMode::Posts => {
            if max_daily == 0 {
                0.0
            } else {
                f64::from(day.count) / f64::from(max_daily)
            }
        }
    };

    if level <= 0.0 {
        HEAT[0]
    } else {
        let steps = (HEAT.len() - 1) as f64;
        let index = (level * steps).ceil().clamp(1.0, steps) as usize;
        HEAT[index]
    }
}

/// Render the contribution grid: one row per weekday, one column per week
pub fn format_heat_map(
    data: &ActivityWeekData,
    mode: ActivityDisplayMode,
    today: NaiveDate,
) -> String {
    let mut output = String::new();

    for (row, weekday) in WEEKDAYS.iter().enumerate() {
        output.push_str(weekday);
        output.push(' ');
        for week in &data.weeks {
            let cell = match week.days.get(row) {
                Some(day) if day.in_range && day.date <= today => {
                    heat_level(day, data.max_daily, mode)
                }
                _ => ' ',
            };
            output.push(cell);
        }
        output.push('\n');
    }

    output
}

pub fn format_success_rate(rate: &SuccessRateData) -> String {
    format!(
        "Success rate: {}/{} ({:.0}%)",
        rate.completed,
        rate.total,
        rate.rate * 100.0
    )
}

/// Heading plus grid plus summary for one range
pub fn format_activity(
    range: &ActivityRange,
    mode: ActivityDisplayMode,
    data: &ActivityWeekData,
    rate: &SuccessRateData,
    today: NaiveDate,
) -> String {
    let mut output = format!("{} ({})\n", range.label(), mode);
    output.push_str(&format_heat_map(data, mode, today));

    match mode {
        ActivityDisplayMode::Habits => output.push_str(&format_success_rate(rate)),
        ActivityDisplayMode::Posts => {
            let posts: u32 = data
                .days()
                .filter(|d| d.in_range)
                .map(|d| d.count)
                .sum();
            output.push_str(&format!("Posts: {}", posts));
        }
    }
    output.push('\n');
    output
}

/// One line per day of an editor: `[x] Label (#habits/tag)`
pub fn format_day_statuses(day: &ContributionDay) -> String {
    if day.habit_statuses.is_empty() {
        return format!("{}: no habits configured", day.date);
    }

    let mut output = format!("{}: {}/{}\n", day.date, day.count, day.total_habits);
    for status in &day.habit_statuses {
        let mark = if status.done { 'x' } else { ' ' };
        output.push_str(&format!("  [{}] {} ({})\n", mark, status.label, status.tag));
    }
    output
}

pub fn format_settings(state: &SettingsState) -> String {
    let mut output = String::new();
    output.push_str(&format!("mode = {}\n", state.mode));
    match (&state.credentials, state.mode) {
        (Some(credentials), _) => {
            output.push_str(&format!("host = {}\n", credentials.base_url()))
        }
        (None, AppMode::Online) => output.push_str("host = (missing)\n"),
        (None, _) => {}
    }
    output.push_str(&format!("theme = {}\n", state.preferences.theme));
    output.push_str(&format!(
        "language = {}\n",
        state.preferences.language.as_deref().unwrap_or("system")
    ));
    output.push_str(&format!(
        "time_range_tab = {}\n",
        state.preferences.time_range_tab
    ));
    if let Some(details) = &state.app_details {
        output.push_str(&format!(
            "{} {} ({})\n",
            details.name, details.version, details.data_dir
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::habits::HabitStatus;
    use crate::domain::{ActivitySnapshot, AppDetails, Preferences, Theme};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn day(count: u32, total: u32) -> ContributionDay {
        ContributionDay {
            date: date(2024, 1, 8),
            count,
            total_habits: total,
            completion_ratio: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            habit_statuses: Vec::new(),
            daily_memo: None,
            in_range: true,
            is_clickable: true,
        }
    }

    #[test]
    fn test_format_empty_feed() {
        assert_eq!(format_feed(&[], &utc()), "No memos found");
    }

    #[test]
    fn test_format_feed() {
        let memos = vec![Memo::new("memos/1", "# Title\n\nSome **bold** text")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap())];
        let output = format_feed(&memos, &utc());
        assert_eq!(output, "2024-01-15 08:30  Title Some bold text\n");
    }

    #[test]
    fn test_format_feed_undated_alignment() {
        let output = format_feed(&[Memo::new("memos/1", "hello")], &utc());
        assert_eq!(output, format!("{}  hello\n", " ".repeat(16)));
    }

    #[test]
    fn test_heat_levels() {
        let habits = ActivityDisplayMode::Habits;
        assert_eq!(heat_level(&day(0, 0), 0, habits), ' ');
        assert_eq!(heat_level(&day(0, 3), 0, habits), '.');
        assert_eq!(heat_level(&day(1, 3), 0, habits), '▒');
        assert_eq!(heat_level(&day(3, 3), 0, habits), '█');

        let posts = ActivityDisplayMode::Posts;
        assert_eq!(heat_level(&day(0, 0), 4, posts), '.');
        assert_eq!(heat_level(&day(1, 0), 4, posts), '░');
        assert_eq!(heat_level(&day(4, 0), 4, posts), '█');
    }

    #[test]
    fn test_format_activity_week() {
        let memos = vec![
            Memo::new("memos/2", "#habits/daily 2024-01-09\n#habits/a")
                .with_create_time(Utc.with_ymd_and_hms(2024, 1, 9, 20, 0, 0).unwrap()),
            Memo::new("memos/1", "#habits/config\nA | #habits/a")
                .with_create_time(Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap()),
        ];
        let snapshot = ActivitySnapshot::from_memos(memos, utc());
        let range = ActivityRange::week_containing(date(2024, 1, 10));
        let today = date(2024, 1, 10);
        let data = snapshot.build_week_data(range, ActivityDisplayMode::Habits, today);
        let rate = crate::domain::calculate_success_rate(&data, range, today, snapshot.config_start_date());

        let output = format_activity(&range, ActivityDisplayMode::Habits, &data, &rate, today);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Jan 8 - Jan 14, 2024 (habits)");
        assert_eq!(lines[1], "Mon .");
        assert_eq!(lines[2], "Tue █");
        assert_eq!(lines[3], "Wed .");
        assert_eq!(lines[4], "Thu  ");
        assert_eq!(lines[8], "Success rate: 1/3 (33%)");
    }

    #[test]
    fn test_format_habit_list() {
        let habits = vec![
            HabitConfig::new("#habits/exercise", "Exercise", 0xFF4CAF50),
            HabitConfig::new("#habits/read", "Read", 0xFF2196F3),
        ];
        assert_eq!(
            format_habit_list(&habits),
            "Exercise  #habits/exercise  #4CAF50\nRead      #habits/read  #2196F3\n"
        );
        assert_eq!(format_habit_list(&[]), "No habits configured");
    }

    #[test]
    fn test_format_day_statuses() {
        let mut d = day(1, 2);
        d.habit_statuses = vec![
            HabitStatus::from_config(&HabitConfig::new("#habits/a", "A", 0), true),
            HabitStatus::from_config(&HabitConfig::new("#habits/b", "B", 0), false),
        ];
        assert_eq!(
            format_day_statuses(&d),
            "2024-01-08: 1/2\n  [x] A (#habits/a)\n  [ ] B (#habits/b)\n"
        );
    }

    #[test]
    fn test_format_settings() {
        let state = SettingsState {
            mode: AppMode::Demo,
            preferences: Preferences {
                theme: Theme::Dark,
                ..Preferences::default()
            },
            app_details: Some(AppDetails {
                name: "memotrack".into(),
                version: "0.1.0".into(),
                data_dir: "/tmp/x".into(),
            }),
            ..SettingsState::default()
        };
        let output = format_settings(&state);
        assert!(output.contains("mode = demo\n"));
        assert!(output.contains("theme = dark\n"));
        assert!(output.contains("language = system\n"));
        assert!(output.contains("memotrack 0.1.0 (/tmp/x)"));
        assert!(!output.contains("host"));
    }
}
