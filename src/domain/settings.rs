//! User settings and credentials

use crate::domain::range::TimeRangeTab;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access to a remote memos server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub host: String,
    pub token: String,
}

impl Credentials {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Credentials {
            host: host.into(),
            token: token.into(),
        }
    }

    /// Host with surrounding whitespace and trailing slashes removed
    pub fn base_url(&self) -> String {
        self.host.trim().trim_end_matches('/').to_string()
    }

    /// Local precondition check; returns a message describing the first problem
    pub fn validation_error(&self) -> Option<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return Some("Base URL must not be blank".to_string());
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Some("Base URL must start with http:// or https://".to_string());
        }
        if self.token.trim().is_empty() {
            return Some("Access token must not be blank".to_string());
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Invalid theme: '{}'. Valid themes are: system, light, dark", s)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        f.write_str(name)
    }
}

/// Locally persisted UI preferences
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub time_range_tab: TimeRangeTab,
    /// BCP 47 language tag, `None` follows the system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub theme: Theme,
}

/// Static facts about the running app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDetails {
    pub name: String,
    pub version: String,
    pub data_dir: String,
}
