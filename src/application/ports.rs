//! Collaborator interfaces the features depend on

use crate::domain::{AppDetails, AppMode, Credentials, Preferences, Theme, TimeRangeTab};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{FixedOffset, Local, NaiveDate};

/// Local persistence for credentials, app mode and preferences
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_credentials(&self) -> Result<Option<Credentials>>;

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()>;

    async fn load_app_mode(&self) -> Result<AppMode>;

    async fn save_app_mode(&self, mode: AppMode) -> Result<()>;

    async fn load_preferences(&self) -> Result<Preferences>;

    async fn save_time_range_tab(&self, tab: TimeRangeTab) -> Result<()>;

    /// `None` follows the system language
    async fn save_language(&self, language: Option<String>) -> Result<()>;

    async fn save_theme(&self, theme: Theme) -> Result<()>;

    /// Forget everything: credentials, mode and preferences
    async fn reset(&self) -> Result<()>;

    fn app_details(&self) -> AppDetails;
}

/// Network check that credentials are accepted by the server
#[async_trait]
pub trait CredentialsValidator: Send + Sync {
    async fn validate(&self, credentials: &Credentials) -> Result<()>;
}

/// Switches the active memo backend
pub trait ModeSwitcher: Send + Sync {
    /// `credentials` replaces the online backend's access when given.
    /// Switching to `NotSelected` also forgets the online credentials.
    fn switch_mode(&self, mode: AppMode, credentials: Option<Credentials>);
}

/// Current local date and timezone
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn offset(&self) -> FixedOffset;
}

/// Clock backed by the system time and timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Clock frozen at one date, for tests and reproducible output
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub today: NaiveDate,
    pub offset: FixedOffset,
}

impl FixedClock {
    pub fn utc(today: NaiveDate) -> Self {
        FixedClock {
            today,
            offset: FixedOffset::east_opt(0).unwrap_or_else(|| *Local::now().offset()),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let clock = FixedClock::utc(day);
        assert_eq!(clock.today(), day);
        assert_eq!(clock.offset().local_minus_utc(), 0);
    }
}
