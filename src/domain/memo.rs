//! Memo model

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use pulldown_cmark::{Event, Parser as MdParser, TagEnd};
use serde::{Deserialize, Serialize};

/// Hashtag prefix shared by every habit-tracking memo
pub const HABITS_HASHTAG: &str = "#habits";

/// A single user-authored note. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Memo {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Memo {
            name: name.into(),
            content: content.into(),
            create_time: None,
            update_time: None,
        }
    }

    pub fn with_create_time(mut self, time: DateTime<Utc>) -> Self {
        self.create_time = Some(time);
        self
    }

    /// Creation timestamp, falling back to the last update
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.create_time.or(self.update_time)
    }

    /// Calendar date of the memo in the caller's timezone
    pub fn local_date(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        self.timestamp()
            .map(|ts| ts.with_timezone(offset).date_naive())
    }

    /// True when the body carries the `#habits` hashtag in any form
    pub fn is_habit_memo(&self) -> bool {
        self.content.contains(HABITS_HASHTAG)
    }

    /// Single-line plain text preview with markdown syntax removed
    pub fn preview(&self, max_chars: usize) -> String {
        let mut text = String::new();

        for event in MdParser::new(&self.content) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item) => text.push(' '),
                _ => {}
            }
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= max_chars {
            collapsed
        } else {
            let truncated: String = collapsed.chars().take(max_chars).collect();
            format!("{}…", truncated.trim_end())
        }
    }
}

/// The memo holding a specific day's habit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMemoInfo {
    pub name: String,
    pub content: String,
}

impl From<&Memo> for DailyMemoInfo {
    fn from(memo: &Memo) -> Self {
        DailyMemoInfo {
            name: memo.name.clone(),
            content: memo.content.clone(),
        }
    }
}
