//! App mode and display mode definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// App modes select which memo data source backs the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    /// First launch, nothing chosen yet
    #[default]
    NotSelected,
    /// Memos live on a remote memos server
    Online,
    /// Memos live in the local data directory
    Offline,
    /// Read-mostly fixture data for trying the app out
    Demo,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::NotSelected => "not_selected",
            AppMode::Online => "online",
            AppMode::Offline => "offline",
            AppMode::Demo => "demo",
        }
    }

    /// Online mode needs credentials before it can be selected
    pub fn requires_credentials(&self) -> bool {
        matches!(self, AppMode::Online)
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(AppMode::Online),
            "offline" => Ok(AppMode::Offline),
            "demo" => Ok(AppMode::Demo),
            "not_selected" => Ok(AppMode::NotSelected),
            _ => Err(format!(
                "Invalid mode: '{}'. Valid modes are: online, offline, demo",
                s
            )),
        }
    }
}

/// What the activity grid counts per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityDisplayMode {
    /// Completed habits from daily log memos
    #[default]
    Habits,
    /// Plain memos posted that day
    Posts,
}

impl fmt::Display for ActivityDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityDisplayMode::Habits => f.write_str("habits"),
            ActivityDisplayMode::Posts => f.write_str("posts"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_valid_modes() {
        assert_eq!(AppMode::from_str("online").unwrap(), AppMode::Online);
        assert_eq!(AppMode::from_str("offline").unwrap(), AppMode::Offline);
        assert_eq!(AppMode::from_str("demo").unwrap(), AppMode::Demo);
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!(AppMode::from_str("ONLINE").unwrap(), AppMode::Online);
        assert_eq!(AppMode::from_str("Demo").unwrap(), AppMode::Demo);
    }

    #[test]
    fn test_from_str_invalid() {
        let err = AppMode::from_str("cloud").unwrap_err();
        assert!(err.contains("Invalid mode"));
        assert!(err.contains("online, offline, demo"));
    }

    #[test]
    fn test_display_roundtrip() {
        for mode in [
            AppMode::NotSelected,
            AppMode::Online,
            AppMode::Offline,
            AppMode::Demo,
        ] {
            assert_eq!(AppMode::from_str(&mode.to_string()).unwrap(), mode);
        }
    }

    #[test]
    fn test_default_is_not_selected() {
        assert_eq!(AppMode::default(), AppMode::NotSelected);
        assert!(AppMode::Online.requires_credentials());
        assert!(!AppMode::Demo.requires_credentials());
    }
}
