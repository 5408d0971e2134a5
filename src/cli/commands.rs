//! CLI command definitions

use crate::error::{MemoTrackError, Result};
use chrono::{Duration, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "memotrack")]
#[command(about = "Habit tracking on top of your memos", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or switch the data source (online, offline, demo)
    Mode {
        /// Mode to switch to; online requires `memotrack login`
        mode: Option<String>,
    },

    /// Connect to a memos server and switch to online mode
    Login {
        /// Server URL, e.g. https://memos.example.com
        #[arg(long)]
        host: String,

        /// Access token created in the server settings
        #[arg(long)]
        token: String,
    },

    /// List memos, newest first
    Feed {
        /// Maximum number of memos to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Create a memo
    Post {
        /// Memo text (markdown)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the habit grid and success rate
    Habits {
        /// Period kind (week, month, quarter, year); defaults to the saved tab
        #[arg(short, long)]
        range: Option<String>,

        /// Periods to move from the current one (negative goes back)
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,

        /// Count plain posts instead of habits
        #[arg(long)]
        posts: bool,

        /// Only show one habit (tag or name)
        #[arg(long)]
        habit: Option<String>,

        /// Print the configured habits instead of the grid
        #[arg(long)]
        list: bool,
    },

    /// Record the habits done on a day; an empty list deletes the day's log
    Check {
        /// today, yesterday or YYYY-MM-DD
        date: String,

        /// Habits completed that day (tags or names)
        tags: Vec<String>,

        /// Confirm deleting the day's log when no habits are given
        #[arg(long)]
        yes: bool,
    },

    /// Save a new habit configuration, one `Label | #habits/tag | #RRGGBB` per argument
    ConfigHabits {
        #[arg(required = true, num_args = 1..)]
        lines: Vec<String>,
    },

    /// Show or change preferences
    Settings {
        /// system, light or dark
        #[arg(long)]
        theme: Option<String>,

        /// Language tag such as `en` or `de`; `system` follows the OS
        #[arg(long)]
        language: Option<String>,

        /// Default period for `memotrack habits`
        #[arg(long)]
        tab: Option<String>,
    },

    /// Forget credentials, mode and preferences
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Parse a day argument relative to `today`
pub fn parse_day(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            MemoTrackError::Config(format!(
                "Invalid date format: '{}' (use today, yesterday or a date)",
                input
            ))
        }),
    }
}
