//! Domain layer - Business logic and domain models

pub mod activity;
pub mod habits;
pub mod memo;
pub mod mode;
pub mod range;
pub mod settings;

pub use activity::{
    activity_week_data_for_habit, build_activity_week_data, calculate_success_rate,
    ActivitySnapshot, ActivityWeek, ActivityWeekData, ContributionDay, SuccessRateData,
};
pub use memo::{DailyMemoInfo, Memo};
pub use mode::{ActivityDisplayMode, AppMode};
pub use range::{ActivityRange, RangeBounds, TimeRangeTab};
pub use settings::{AppDetails, Credentials, Preferences, Theme};
