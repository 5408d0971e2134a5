//! Activity range arithmetic
//!
//! Week/Month/Quarter/Year periods and the navigation math between them.
//! Everything here is pure calendar arithmetic over [`NaiveDate`].

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive calendar-date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RangeBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days in the window
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A navigable calendar period
///
/// `month` is 1..=12 and `quarter` is 1..=4. Use the checked constructors
/// when building from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityRange {
    Week { start: NaiveDate },
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

/// Get the Monday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.clamp(1, 12), 1)
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month >= 12 {
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }
    first_of_month(year, month.max(1) + 1)?.pred_opt()
}

impl ActivityRange {
    /// Week range starting on the Monday of the week containing `date`
    pub fn week_containing(date: NaiveDate) -> Self {
        ActivityRange::Week {
            start: start_of_week(date),
        }
    }

    pub fn month(year: i32, month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(ActivityRange::Month { year, month })
    }

    pub fn quarter(year: i32, quarter: u32) -> Option<Self> {
        (1..=4)
            .contains(&quarter)
            .then_some(ActivityRange::Quarter { year, quarter })
    }

    pub fn year(year: i32) -> Self {
        ActivityRange::Year { year }
    }

    /// The period of kind `tab` that contains `today`
    pub fn current(tab: TimeRangeTab, today: NaiveDate) -> Self {
        match tab {
            TimeRangeTab::Week => Self::week_containing(today),
            TimeRangeTab::Month => ActivityRange::Month {
                year: today.year(),
                month: today.month(),
            },
            TimeRangeTab::Quarter => ActivityRange::Quarter {
                year: today.year(),
                quarter: (today.month() - 1) / 3 + 1,
            },
            TimeRangeTab::Year => ActivityRange::Year { year: today.year() },
        }
    }

    /// Which tab this range belongs to
    pub fn tab(&self) -> TimeRangeTab {
        match self {
            ActivityRange::Week { .. } => TimeRangeTab::Week,
            ActivityRange::Month { .. } => TimeRangeTab::Month,
            ActivityRange::Quarter { .. } => TimeRangeTab::Quarter,
            ActivityRange::Year { .. } => TimeRangeTab::Year,
        }
    }

    /// Inclusive date window covered by this range
    ///
    /// Periods past the ends of the calendar collapse onto the nearest
    /// representable date; [`ActivityRange::shift`] never produces them.
    pub fn bounds(&self) -> RangeBounds {
        self.checked_bounds().unwrap_or_else(|| {
            let edge = match *self {
                ActivityRange::Week { start } => start,
                ActivityRange::Month { year, .. }
                | ActivityRange::Quarter { year, .. }
                | ActivityRange::Year { year } => {
                    if year < 0 {
                        NaiveDate::MIN
                    } else {
                        NaiveDate::MAX
                    }
                }
            };
            RangeBounds {
                start: edge,
                end: edge,
            }
        })
    }

    fn checked_bounds(&self) -> Option<RangeBounds> {
        let (start, end) = match *self {
            ActivityRange::Week { start } => {
                (Some(start), start.checked_add_signed(Duration::days(6)))
            }
            ActivityRange::Month { year, month } => {
                (first_of_month(year, month), last_of_month(year, month))
            }
            ActivityRange::Quarter { year, quarter } => {
                let first_month = (quarter.clamp(1, 4) - 1) * 3 + 1;
                (
                    first_of_month(year, first_month),
                    last_of_month(year, first_month + 2),
                )
            }
            ActivityRange::Year { year } => (first_of_month(year, 1), last_of_month(year, 12)),
        };
        Some(RangeBounds {
            start: start?,
            end: end?,
        })
    }

    /// Move by `delta` periods of the same kind
    ///
    /// Returns `None` when the target period falls outside the calendar.
    pub fn shift(&self, delta: i32) -> Option<Self> {
        let shifted = match *self {
            ActivityRange::Week { start } => ActivityRange::Week {
                start: start.checked_add_signed(Duration::try_weeks(delta as i64)?)?,
            },
            ActivityRange::Month { year, month } => {
                let index = year as i64 * 12 + (month as i64 - 1) + delta as i64;
                ActivityRange::Month {
                    year: i32::try_from(index.div_euclid(12)).ok()?,
                    month: index.rem_euclid(12) as u32 + 1,
                }
            }
            ActivityRange::Quarter { year, quarter } => {
                let index = year as i64 * 4 + (quarter as i64 - 1) + delta as i64;
                ActivityRange::Quarter {
                    year: i32::try_from(index.div_euclid(4)).ok()?,
                    quarter: index.rem_euclid(4) as u32 + 1,
                }
            }
            ActivityRange::Year { year } => ActivityRange::Year {
                year: year.checked_add(delta)?,
            },
        };
        shifted.checked_bounds().map(|_| shifted)
    }

    /// Strictly earlier than `other`. Ranges of different kinds never compare.
    pub fn is_before(&self, other: &ActivityRange) -> bool {
        match (*self, *other) {
            (ActivityRange::Week { start: a }, ActivityRange::Week { start: b }) => a < b,
            (
                ActivityRange::Month { year: ay, month: am },
                ActivityRange::Month { year: by, month: bm },
            ) => (ay, am) < (by, bm),
            (
                ActivityRange::Quarter {
                    year: ay,
                    quarter: aq,
                },
                ActivityRange::Quarter {
                    year: by,
                    quarter: bq,
                },
            ) => (ay, aq) < (by, bq),
            (ActivityRange::Year { year: a }, ActivityRange::Year { year: b }) => a < b,
            _ => false,
        }
    }

    /// Number of periods to shift `self` by to reach `to`; 0 across kinds
    pub fn calculate_delta(&self, to: &ActivityRange) -> i32 {
        match (*self, *to) {
            (ActivityRange::Week { start: a }, ActivityRange::Week { start: b }) => {
                (b - a).num_days().div_euclid(7) as i32
            }
            (
                ActivityRange::Month { year: ay, month: am },
                ActivityRange::Month { year: by, month: bm },
            ) => ((by as i64 - ay as i64) * 12 + bm as i64 - am as i64) as i32,
            (
                ActivityRange::Quarter {
                    year: ay,
                    quarter: aq,
                },
                ActivityRange::Quarter {
                    year: by,
                    quarter: bq,
                },
            ) => ((by as i64 - ay as i64) * 4 + bq as i64 - aq as i64) as i32,
            (ActivityRange::Year { year: a }, ActivityRange::Year { year: b }) => {
                (b as i64 - a as i64) as i32
            }
            _ => 0,
        }
    }

    /// Human-readable label; `month_name` maps 1..=12 to a month abbreviation
    pub fn format_label<F>(&self, month_name: F) -> String
    where
        F: Fn(u32) -> String,
    {
        match *self {
            ActivityRange::Week { start } => {
                let end = self.bounds().end;
                if start.year() == end.year() {
                    format!(
                        "{} {} - {} {}, {}",
                        month_name(start.month()),
                        start.day(),
                        month_name(end.month()),
                        end.day(),
                        end.year()
                    )
                } else {
                    format!(
                        "{} {}, {} - {} {}, {}",
                        month_name(start.month()),
                        start.day(),
                        start.year(),
                        month_name(end.month()),
                        end.day(),
                        end.year()
                    )
                }
            }
            ActivityRange::Month { year, month } => format!("{} {}", month_name(month), year),
            ActivityRange::Quarter { year, quarter } => format!("Q{} {}", quarter, year),
            ActivityRange::Year { year } => year.to_string(),
        }
    }

    /// Label using English month abbreviations
    pub fn label(&self) -> String {
        self.format_label(english_month_abbrev)
    }
}

/// English three-letter month abbreviation ("Jan".."Dec")
pub fn english_month_abbrev(month: u32) -> String {
    first_of_month(2000, month)
        .map(|date| date.format("%b").to_string())
        .unwrap_or_default()
}

impl fmt::Display for ActivityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Period kinds offered as tabs in the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeRangeTab {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl TimeRangeTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRangeTab::Week => "week",
            TimeRangeTab::Month => "month",
            TimeRangeTab::Quarter => "quarter",
            TimeRangeTab::Year => "year",
        }
    }
}

impl fmt::Display for TimeRangeTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRangeTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(TimeRangeTab::Week),
            "month" => Ok(TimeRangeTab::Month),
            "quarter" => Ok(TimeRangeTab::Quarter),
            "year" => Ok(TimeRangeTab::Year),
            _ => Err(format!(
                "'{}' is not one of: week, month, quarter, year",
                s
            )),
        }
    }
}
