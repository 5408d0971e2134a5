//! Settings persistence
//!
//! Everything the app remembers between runs lives in `settings.toml` under
//! the data directory. Offline memos sit next to it in `memos/`.

use crate::application::ports::SettingsStore;
use crate::domain::{AppDetails, AppMode, Credentials, Preferences, Theme, TimeRangeTab};
use crate::error::{MemoTrackError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

pub const DATA_DIR_ENV: &str = "MEMOTRACK_HOME";
const SETTINGS_FILE: &str = "settings.toml";
const MEMOS_DIR: &str = "memos";

/// Resolve the data directory: `$MEMOTRACK_HOME`, else the platform data dir
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(DATA_DIR_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::data_dir()
        .map(|dir| dir.join("memotrack"))
        .ok_or_else(|| {
            MemoTrackError::Config(format!(
                "Could not determine a data directory; set {}",
                DATA_DIR_ENV
            ))
        })
}

/// Directory holding offline memos
pub fn memos_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(MEMOS_DIR)
}

fn app_details(data_dir: String) -> AppDetails {
    AppDetails {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data_dir,
    }
}

/// Contents of `settings.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: AppMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    pub preferences: Preferences,
}

impl Settings {
    /// Load settings from `settings.toml` in `dir`; a missing file yields defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(MemoTrackError::Io(e)),
        };

        toml::from_str(&contents)
            .map_err(|e| MemoTrackError::Config(format!("Failed to parse settings.toml: {}", e)))
    }

    /// Save settings to `settings.toml` in `dir`, creating the directory
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| MemoTrackError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(dir.join(SETTINGS_FILE), contents)?;
        Ok(())
    }
}

/// `settings.toml` backed implementation of [`SettingsStore`]
pub struct FileSettingsStore {
    data_dir: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: tokio::sync::Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(data_dir: PathBuf) -> Self {
        FileSettingsStore {
            data_dir,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn read(&self) -> Result<Settings> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    async fn read_unlocked(&self) -> Result<Settings> {
        let dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || Settings::load_from_dir(&dir))
            .await
            .map_err(|e| MemoTrackError::Background(e.to_string()))?
    }

    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Settings) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut settings = self.read_unlocked().await?;
        change(&mut settings);

        let dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || settings.save_to_dir(&dir))
            .await
            .map_err(|e| MemoTrackError::Background(e.to_string()))?
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load_credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.read().await?.credentials)
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        let credentials = credentials.clone();
        self.update(move |s| s.credentials = Some(credentials)).await
    }

    async fn load_app_mode(&self) -> Result<AppMode> {
        Ok(self.read().await?.mode)
    }

    async fn save_app_mode(&self, mode: AppMode) -> Result<()> {
        debug!(%mode, "saving app mode");
        self.update(move |s| s.mode = mode).await
    }

    async fn load_preferences(&self) -> Result<Preferences> {
        Ok(self.read().await?.preferences)
    }

    async fn save_time_range_tab(&self, tab: TimeRangeTab) -> Result<()> {
        self.update(move |s| s.preferences.time_range_tab = tab).await
    }

    async fn save_language(&self, language: Option<String>) -> Result<()> {
        self.update(move |s| s.preferences.language = language).await
    }

    async fn save_theme(&self, theme: Theme) -> Result<()> {
        self.update(move |s| s.preferences.theme = theme).await
    }

    async fn reset(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(self.data_dir.join(SETTINGS_FILE)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MemoTrackError::Io(e)),
        }
        info!(data_dir = %self.data_dir.display(), "settings reset");
        Ok(())
    }

    fn app_details(&self) -> AppDetails {
        app_details(self.data_dir.display().to_string())
    }
}

/// In-memory implementation of [`SettingsStore`]
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        MemorySettingsStore {
            settings: Mutex::new(settings),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn update(&self, change: impl FnOnce(&mut Settings)) {
        change(&mut *self.settings.lock().unwrap_or_else(|p| p.into_inner()));
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load_credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.snapshot().credentials)
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.update(|s| s.credentials = Some(credentials.clone()));
        Ok(())
    }

    async fn load_app_mode(&self) -> Result<AppMode> {
        Ok(self.snapshot().mode)
    }

    async fn save_app_mode(&self, mode: AppMode) -> Result<()> {
        self.update(|s| s.mode = mode);
        Ok(())
    }

    async fn load_preferences(&self) -> Result<Preferences> {
        Ok(self.snapshot().preferences)
    }

    async fn save_time_range_tab(&self, tab: TimeRangeTab) -> Result<()> {
        self.update(|s| s.preferences.time_range_tab = tab);
        Ok(())
    }

    async fn save_language(&self, language: Option<String>) -> Result<()> {
        self.update(|s| s.preferences.language = language);
        Ok(())
    }

    async fn save_theme(&self, theme: Theme) -> Result<()> {
        self.update(|s| s.preferences.theme = theme);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.update(|s| *s = Settings::default());
        Ok(())
    }

    fn app_details(&self) -> AppDetails {
        app_details(":memory:".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_settings_file_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load_from_dir(temp.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.mode, AppMode::NotSelected);
    }

    #[test]
    fn test_settings_roundtrip_file() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            mode: AppMode::Online,
            credentials: Some(Credentials::new("https://memos.example.com", "tok")),
            preferences: Preferences {
                time_range_tab: TimeRangeTab::Quarter,
                language: Some("de".to_string()),
                theme: Theme::Dark,
            },
        };

        settings.save_to_dir(&temp.path().join("nested")).unwrap();
        let loaded = Settings::load_from_dir(&temp.path().join("nested")).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_settings_file_layout() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            mode: AppMode::Offline,
            ..Settings::default()
        };
        settings.save_to_dir(temp.path()).unwrap();

        let text = std::fs::read_to_string(temp.path().join(SETTINGS_FILE)).unwrap();
        assert!(text.contains("mode = \"offline\""));
        assert!(text.contains("[preferences]"));
        assert!(!text.contains("[credentials]"));
    }

    #[test]
    fn test_invalid_settings_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(SETTINGS_FILE), "mode = [").unwrap();
        let result = Settings::load_from_dir(temp.path());
        assert!(matches!(result, Err(MemoTrackError::Config(_))));
    }

    #[tokio::test]
    async fn test_file_store_updates_fields_independently() {
        let temp = TempDir::new().unwrap();
        let store = FileSettingsStore::new(temp.path().to_path_buf());

        store.save_app_mode(AppMode::Demo).await.unwrap();
        store.save_theme(Theme::Light).await.unwrap();
        store
            .save_credentials(&Credentials::new("https://m.example.com", "abc"))
            .await
            .unwrap();

        assert_eq!(store.load_app_mode().await.unwrap(), AppMode::Demo);
        assert_eq!(store.load_preferences().await.unwrap().theme, Theme::Light);
        assert_eq!(
            store.load_credentials().await.unwrap().unwrap().token,
            "abc"
        );
    }

    #[tokio::test]
    async fn test_file_store_reset() {
        let temp = TempDir::new().unwrap();
        let store = FileSettingsStore::new(temp.path().to_path_buf());

        store.reset().await.unwrap();
        store.save_app_mode(AppMode::Offline).await.unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.load_app_mode().await.unwrap(), AppMode::NotSelected);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySettingsStore::default();
        store.save_language(Some("fr".to_string())).await.unwrap();
        store.save_time_range_tab(TimeRangeTab::Week).await.unwrap();

        let prefs = store.load_preferences().await.unwrap();
        assert_eq!(prefs.language.as_deref(), Some("fr"));
        assert_eq!(prefs.time_range_tab, TimeRangeTab::Week);

        store.reset().await.unwrap();
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn test_memos_dir() {
        assert_eq!(memos_dir(Path::new("/data")), PathBuf::from("/data/memos"));
    }
}
