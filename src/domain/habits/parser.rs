//! Habit parsing from memo text
//!
//! Memos double as habit storage. A config memo carries `#habits/config`
//! (or `#habits_config`) followed by one `Label | #habits/<tag> | #RRGGBB`
//! line per habit. A daily memo carries `#habits/daily` (or `#daily`), an
//! optional `YYYY-MM-DD` date token, and the completed habits either as bare
//! tags or as markdown checkboxes.

use super::config::{HabitConfig, HabitsConfigEntry, DEFAULT_HABIT_COLOR};
use crate::domain::memo::{DailyMemoInfo, Memo};
use chrono::{FixedOffset, NaiveDate};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// Prefix every normalized habit tag starts with
pub const HABIT_TAG_PREFIX: &str = "#habits/";

const CONFIG_MARKERS: [&str; 2] = ["#habits/config", "#habits_config"];
const DAILY_MARKERS: [&str; 2] = ["#habits/daily", "#daily"];

/// Regex for markdown task list lines: `- [x] text`, `- [ ] text`
fn checkbox_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+\[([ xX])\][ \t]?(.*)$").unwrap())
}

fn date_token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// True if the memo body defines a habit configuration
pub fn is_habits_config_memo(content: &str) -> bool {
    CONFIG_MARKERS.iter().any(|m| content.contains(m))
}

/// True if the memo body is a daily habit log
pub fn is_daily_memo(content: &str) -> bool {
    DAILY_MARKERS.iter().any(|m| content.contains(m))
}

/// Explicit date token of a daily memo.
///
/// Only the first `YYYY-MM-DD` token counts; if it is not a real date the
/// caller falls back to the memo timestamp.
pub fn daily_memo_date(content: &str) -> Option<NaiveDate> {
    let token = date_token_regex().captures(content)?;
    NaiveDate::parse_from_str(&token[1], "%Y-%m-%d").ok()
}

/// Canonicalize a user-entered habit identifier to `#habits/<slug>`.
///
/// Accepts `exercise`, `#exercise`, `#habits/exercise` or `Morning Run`
/// (whitespace runs become `_`). Blank input yields `None`.
pub fn normalize_habit_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_hash = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let slug = without_hash
        .strip_prefix("habits/")
        .unwrap_or(without_hash)
        .trim();

    if slug.is_empty() {
        return None;
    }

    Some(format!(
        "{}{}",
        HABIT_TAG_PREFIX,
        whitespace_regex().replace_all(slug, "_")
    ))
}

/// Human label for a tag: prefix stripped, underscores become spaces
pub fn label_from_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    let slug = trimmed
        .strip_prefix(HABIT_TAG_PREFIX)
        .or_else(|| trimmed.strip_prefix('#'))
        .unwrap_or(trimmed);
    slug.replace('_', " ")
}

/// Parse a 6-hex-digit color (`#4CAF50` or `4CAF50`) into opaque ARGB
pub fn parse_color(raw: &str) -> Option<u32> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(|rgb| 0xFF00_0000 | rgb)
}

/// Parse one `Label | Tag | Color` config line.
///
/// Segments are positional. A single segment is a tag if it starts with `#`
/// and a label otherwise; the missing half is derived. With two or more
/// segments the first is always the label and the second always the tag,
/// even when the first already looks like a tag.
pub fn parse_habit_config_line(line: &str) -> Option<HabitConfig> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let segments: Vec<&str> = line.split('|').map(str::trim).collect();

    if let [single] = segments.as_slice() {
        return if single.starts_with('#') {
            let tag = normalize_habit_tag(single)?;
            let label = label_from_tag(&tag);
            Some(HabitConfig::new(tag, label, DEFAULT_HABIT_COLOR))
        } else {
            let tag = normalize_habit_tag(single)?;
            Some(HabitConfig::new(tag, *single, DEFAULT_HABIT_COLOR))
        };
    }

    let label_raw = segments[0];
    let tag_raw = segments[1];
    let color = segments
        .get(2)
        .and_then(|c| parse_color(c))
        .unwrap_or(DEFAULT_HABIT_COLOR);

    let tag = normalize_habit_tag(tag_raw).or_else(|| normalize_habit_tag(label_raw))?;
    let label = if label_raw.is_empty() {
        label_from_tag(&tag)
    } else {
        label_raw.to_string()
    };

    Some(HabitConfig::new(tag, label, color))
}

/// Parse every habit line of a config memo body.
///
/// Header lines are skipped, unparseable lines are dropped and duplicate tags
/// keep their first occurrence.
pub fn parse_habits_config(content: &str) -> Vec<HabitConfig> {
    let mut seen = HashSet::new();
    let mut habits = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if CONFIG_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
            continue;
        }
        let Some(habit) = parse_habit_config_line(trimmed) else {
            continue;
        };
        if seen.insert(habit.tag.clone()) {
            habits.push(habit);
        } else {
            debug!(tag = %habit.tag, "duplicate habit tag in config, keeping first");
        }
    }

    habits
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

/// True if `tag` occurs in `text` as a whole token
fn contains_tag(text: &str, tag: &str) -> bool {
    text.match_indices(tag).any(|(idx, _)| {
        text[idx + tag.len()..]
            .chars()
            .next()
            .is_none_or(|next| !is_tag_char(next))
    })
}

/// True if the text contains at least one markdown checkbox line
pub fn has_checkboxes(content: &str) -> bool {
    checkbox_regex().is_match(content)
}

/// Known tags counted as completed in `content`, in `known_tags` order.
///
/// When the text has any checkbox line only tags inside checked boxes count
/// and bare tags elsewhere are ignored. Without checkboxes every known tag
/// present in the text counts.
pub fn extract_completed_habits<'a, I>(content: &str, known_tags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let known: Vec<&str> = known_tags.into_iter().collect();

    if has_checkboxes(content) {
        let checked: Vec<&str> = checkbox_regex()
            .captures_iter(content)
            .filter(|cap| cap[1].eq_ignore_ascii_case("x"))
            .filter_map(|cap| cap.get(2).map(|m| m.as_str()))
            .collect();

        return known
            .into_iter()
            .filter(|tag| checked.iter().any(|line| contains_tag(line, tag)))
            .map(str::to_string)
            .collect();
    }

    known
        .into_iter()
        .filter(|tag| contains_tag(content, tag))
        .map(str::to_string)
        .collect()
}

/// Build the config timeline from a memo list, ascending by memo timestamp.
///
/// Config memos without any timestamp cannot be placed and are skipped.
pub fn build_config_timeline(memos: &[Memo], offset: &FixedOffset) -> Vec<HabitsConfigEntry> {
    let mut timeline: Vec<HabitsConfigEntry> = memos
        .iter()
        .filter(|memo| is_habits_config_memo(&memo.content))
        .filter_map(|memo| {
            let Some(date) = memo.local_date(offset) else {
                debug!(memo = %memo.name, "config memo has no timestamp, skipping");
                return None;
            };
            Some(HabitsConfigEntry {
                date,
                habits: parse_habits_config(&memo.content),
                source_memo: memo.clone(),
            })
        })
        .collect();

    timeline.sort_by_key(|entry| entry.timestamp());
    timeline
}

/// Index daily log memos by the day they describe.
///
/// The explicit date token wins over the memo timestamp. When two memos
/// describe the same day the one earlier in `memos` is kept.
pub fn build_daily_memo_index(
    memos: &[Memo],
    offset: &FixedOffset,
) -> BTreeMap<NaiveDate, DailyMemoInfo> {
    let mut index = BTreeMap::new();

    for memo in memos {
        if is_habits_config_memo(&memo.content) || !is_daily_memo(&memo.content) {
            continue;
        }
        let Some(date) = daily_memo_date(&memo.content).or_else(|| memo.local_date(offset))
        else {
            continue;
        };
        index.entry(date).or_insert_with(|| DailyMemoInfo::from(memo));
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_full_config_line() {
        let habit = parse_habit_config_line("Exercise | #habits/exercise | #4CAF50").unwrap();
        assert_eq!(habit.label, "Exercise");
        assert_eq!(habit.tag, "#habits/exercise");
        assert_eq!(habit.color, 0xFF4CAF50);
    }

    #[test]
    fn test_parse_tag_only_line() {
        let habit = parse_habit_config_line("#habits/read_books").unwrap();
        assert_eq!(habit.tag, "#habits/read_books");
        assert_eq!(habit.label, "read books");
        assert_eq!(habit.color, DEFAULT_HABIT_COLOR);
    }

    #[test]
    fn test_parse_label_only_line() {
        let habit = parse_habit_config_line("Morning   Run").unwrap();
        assert_eq!(habit.label, "Morning   Run");
        assert_eq!(habit.tag, "#habits/Morning_Run");
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(parse_habit_config_line("").is_none());
        assert!(parse_habit_config_line("   ").is_none());
        assert!(parse_habit_config_line(" | | ").is_none());
    }

    #[test]
    fn test_two_segments_are_positional() {
        // A tag in first position is still treated as the label, and the
        // color string becomes the tag.
        let habit = parse_habit_config_line("#habits/run | #FF0000").unwrap();
        assert_eq!(habit.label, "#habits/run");
        assert_eq!(habit.tag, "#habits/FF0000");
        assert_eq!(habit.color, DEFAULT_HABIT_COLOR);
    }

    #[test]
    fn test_invalid_color_falls_back() {
        let habit = parse_habit_config_line("Read | #habits/read | blue").unwrap();
        assert_eq!(habit.color, DEFAULT_HABIT_COLOR);
        let habit = parse_habit_config_line("Read | #habits/read | #12345").unwrap();
        assert_eq!(habit.color, DEFAULT_HABIT_COLOR);
    }

    #[test]
    fn test_empty_label_or_tag_is_derived() {
        let habit = parse_habit_config_line(" | #habits/deep_work | #2196F3").unwrap();
        assert_eq!(habit.label, "deep work");
        assert_eq!(habit.color, 0xFF2196F3);

        let habit = parse_habit_config_line("Stretch |  | #2196F3").unwrap();
        assert_eq!(habit.tag, "#habits/Stretch");
    }

    #[test]
    fn test_normalize_habit_tag() {
        assert_eq!(normalize_habit_tag("exercise").unwrap(), "#habits/exercise");
        assert_eq!(normalize_habit_tag("#exercise").unwrap(), "#habits/exercise");
        assert_eq!(normalize_habit_tag("#habits/exercise").unwrap(), "#habits/exercise");
        assert_eq!(normalize_habit_tag(" read  books ").unwrap(), "#habits/read_books");
        assert!(normalize_habit_tag("#").is_none());
        assert!(normalize_habit_tag("#habits/").is_none());
    }

    #[test]
    fn test_label_from_tag() {
        assert_eq!(label_from_tag("#habits/read_books"), "read books");
        assert_eq!(label_from_tag("#meditate"), "meditate");
    }

    #[test]
    fn test_parse_habits_config_dedupes_first_wins() {
        let content = "#habits/config\n\
            Exercise | #habits/exercise | #4CAF50\n\
            \n\
            Reading | #habits/reading | #2196F3\n\
            Workout | #habits/exercise | #FF0000\n";
        let habits = parse_habits_config(content);
        assert_eq!(habits.len(), 2);
        assert_eq!(habits[0].label, "Exercise");
        assert_eq!(habits[0].color, 0xFF4CAF50);
        assert_eq!(habits[1].tag, "#habits/reading");
    }

    #[test]
    fn test_memo_kind_detection() {
        assert!(is_habits_config_memo("#habits/config\nRun"));
        assert!(is_habits_config_memo("#habits_config\nRun"));
        assert!(is_daily_memo("#habits/daily 2024-01-15"));
        assert!(is_daily_memo("#daily\n#habits/run"));
        assert!(!is_daily_memo("#habits/run"));
    }

    #[test]
    fn test_daily_memo_date() {
        assert_eq!(
            daily_memo_date("#habits/daily 2024-01-15\n#habits/run"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        // First token wins even if a later one exists
        assert_eq!(
            daily_memo_date("#daily 2024-02-01 moved from 2024-01-31"),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert_eq!(daily_memo_date("#daily 2024-13-45"), None);
        assert_eq!(daily_memo_date("#daily"), None);
    }

    #[test]
    fn test_extract_bare_tags() {
        let content = "#habits/daily 2024-01-15\n#habits/exercise\n#habits/reading";
        let done = extract_completed_habits(
            content,
            ["#habits/exercise", "#habits/reading", "#habits/meditate"],
        );
        assert_eq!(done, vec!["#habits/exercise", "#habits/reading"]);
    }

    #[test]
    fn test_extract_requires_whole_tag() {
        let content = "#habits/daily\n#habits/reading";
        let done = extract_completed_habits(content, ["#habits/read"]);
        assert!(done.is_empty());
    }

    #[test]
    fn test_checkboxes_take_precedence() {
        let content = "#habits/daily 2024-01-15\n\
            - [x] Exercise #habits/exercise\n\
            - [ ] Reading #habits/reading\n\
            #habits/meditate";
        let done = extract_completed_habits(
            content,
            ["#habits/exercise", "#habits/reading", "#habits/meditate"],
        );
        assert_eq!(done, vec!["#habits/exercise"]);
    }

    #[test]
    fn test_checkbox_uppercase_x() {
        let content = "* [X] Run #habits/run";
        assert_eq!(extract_completed_habits(content, ["#habits/run"]), vec!["#habits/run"]);
    }

    #[test]
    fn test_all_unchecked_yields_nothing() {
        let content = "- [ ] Run #habits/run\n#habits/run";
        assert!(extract_completed_habits(content, ["#habits/run"]).is_empty());
    }

    #[test]
    fn test_build_config_timeline_sorted() {
        let later = Memo::new("memos/2", "#habits/config\nRead | #habits/read")
            .with_create_time(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        let earlier = Memo::new("memos/1", "#habits/config\nRun | #habits/run")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let undated = Memo::new("memos/3", "#habits/config\nNap");
        let post = Memo::new("memos/4", "hello")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap());

        let timeline = build_config_timeline(&[later, earlier, undated, post], &utc());
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].source_memo.name, "memos/1");
        assert_eq!(timeline[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(timeline[1].habits[0].tag, "#habits/read");
    }

    #[test]
    fn test_build_daily_memo_index() {
        let explicit = Memo::new("memos/1", "#habits/daily 2024-01-10\n#habits/run")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 12, 9, 0, 0).unwrap());
        let implicit = Memo::new("memos/2", "#daily\n#habits/run")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 11, 9, 0, 0).unwrap());
        let duplicate = Memo::new("memos/3", "#habits/daily 2024-01-10")
            .with_create_time(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());

        let index = build_daily_memo_index(&[explicit, implicit, duplicate], &utc());
        assert_eq!(index.len(), 2);
        assert_eq!(
            index[&NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()].name,
            "memos/1"
        );
        assert_eq!(
            index[&NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()].name,
            "memos/2"
        );
    }
}
