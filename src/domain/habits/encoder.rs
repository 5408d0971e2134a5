//! Serialization of habit structures back into memo text

use super::config::HabitConfig;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Header line of a daily log memo
pub const DAILY_HEADER: &str = "#habits/daily";

/// Header line of a habit config memo
pub const CONFIG_HEADER: &str = "#habits/config";

/// Daily log memo body: date header, then one line per selected habit in
/// `config` order.
pub fn build_daily_content(
    date: NaiveDate,
    config: &[HabitConfig],
    selections: &BTreeMap<String, bool>,
) -> String {
    let mut lines = vec![format!("{} {}", DAILY_HEADER, date.format("%Y-%m-%d"))];

    lines.extend(
        config
            .iter()
            .filter(|habit| selections.get(&habit.tag).copied().unwrap_or(false))
            .map(|habit| habit.tag.clone()),
    );

    lines.join("\n")
}

/// Config memo body: header, then `Label | Tag | #RRGGBB` per habit
pub fn build_habits_config_content_from_list(habits: &[HabitConfig]) -> String {
    let mut lines = vec![CONFIG_HEADER.to_string()];

    lines.extend(
        habits
            .iter()
            .map(|habit| format!("{} | {} | {}", habit.label, habit.tag, habit.color_hex())),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::habits::parser::{extract_completed_habits, parse_habits_config};

    fn habits() -> Vec<HabitConfig> {
        vec![
            HabitConfig::new("#habits/exercise", "Exercise", 0xFF4CAF50),
            HabitConfig::new("#habits/reading", "Reading", 0xFF2196F3),
        ]
    }

    #[test]
    fn test_build_daily_content() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut selections = BTreeMap::new();
        selections.insert("#habits/exercise".to_string(), true);
        selections.insert("#habits/reading".to_string(), false);

        let content = build_daily_content(date, &habits(), &selections);
        assert!(content.starts_with("#habits/daily 2024-01-15"));
        assert!(content.contains("#habits/exercise"));
        assert!(!content.contains("#habits/reading"));
    }

    #[test]
    fn test_daily_content_follows_config_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let selections: BTreeMap<String, bool> = [
            ("#habits/reading".to_string(), true),
            ("#habits/exercise".to_string(), true),
        ]
        .into_iter()
        .collect();

        let content = build_daily_content(date, &habits(), &selections);
        assert_eq!(
            content,
            "#habits/daily 2024-01-15\n#habits/exercise\n#habits/reading"
        );
    }

    #[test]
    fn test_daily_content_is_parsed_back() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let selections: BTreeMap<String, bool> =
            [("#habits/reading".to_string(), true)].into_iter().collect();
        let content = build_daily_content(date, &habits(), &selections);

        let done = extract_completed_habits(&content, habits().iter().map(|h| h.tag.as_str()));
        assert_eq!(done, vec!["#habits/reading"]);
    }

    #[test]
    fn test_build_config_content() {
        let content = build_habits_config_content_from_list(&habits());
        assert_eq!(
            content,
            "#habits/config\n\
             Exercise | #habits/exercise | #4CAF50\n\
             Reading | #habits/reading | #2196F3"
        );
        assert_eq!(parse_habits_config(&content), habits());
    }
}
