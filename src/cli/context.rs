//! Wiring of stores, repositories and features for one CLI invocation

use crate::application::{
    habits_feature, mode_selection_feature, settings_feature, ActivityCache, Clock,
    HabitsFeature, ModeSelectionFeature, SettingsFeature, SettingsStore, SystemClock,
};
use crate::domain::{AppMode, TimeRangeTab};
use crate::error::{MemoTrackError, Result};
use crate::infrastructure::{
    demo_memos, memos_dir, resolve_data_dir, FileSettingsStore, InMemoryMemosRepository,
    ModeAwareRepository, OfflineMemosRepository, RemoteCredentialsValidator,
    RemoteMemosRepository,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub struct AppContext {
    pub data_dir: PathBuf,
    pub store: Arc<FileSettingsStore>,
    pub repository: Arc<ModeAwareRepository>,
    pub clock: Arc<dyn Clock>,
    pub validator: Arc<RemoteCredentialsValidator>,
    pub cache: Arc<ActivityCache>,
}

impl AppContext {
    /// Open the data directory from the environment
    pub async fn open() -> Result<Self> {
        Self::open_at(resolve_data_dir()?).await
    }

    pub async fn open_at(data_dir: PathBuf) -> Result<Self> {
        let store = Arc::new(FileSettingsStore::new(data_dir.clone()));
        let mode = store.load_app_mode().await?;
        let credentials = store.load_credentials().await?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        debug!(data_dir = %data_dir.display(), %mode, "opening app context");

        let online = Arc::new(RemoteMemosRepository::new(credentials)?);
        let offline = Arc::new(OfflineMemosRepository::new(memos_dir(&data_dir)));
        let demo = Arc::new(InMemoryMemosRepository::new(demo_memos(
            clock.today(),
            &clock.offset(),
        )));
        let repository = Arc::new(ModeAwareRepository::new(online, offline, demo, mode));

        Ok(AppContext {
            data_dir,
            store,
            repository,
            clock,
            validator: Arc::new(RemoteCredentialsValidator::new()?),
            cache: Arc::new(ActivityCache::new()),
        })
    }

    /// Fail early with the mode hint when no backend is active
    pub fn require_mode(&self) -> Result<AppMode> {
        match self.repository.mode() {
            AppMode::NotSelected => Err(MemoTrackError::ModeNotSelected),
            mode => Ok(mode),
        }
    }

    pub fn habits(&self, tab: TimeRangeTab) -> HabitsFeature {
        habits_feature(
            tab,
            self.repository.clone(),
            self.clock.clone(),
            self.cache.clone(),
        )
    }

    pub fn mode_selection(&self) -> ModeSelectionFeature {
        mode_selection_feature(
            self.store.clone(),
            self.validator.clone(),
            self.repository.clone(),
        )
    }

    pub fn settings(&self) -> SettingsFeature {
        settings_feature(
            self.store.clone(),
            self.validator.clone(),
            self.repository.clone(),
        )
    }
}

/// Turn an error message left in feature state into a command failure
pub fn check_error(error: &Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(MemoTrackError::Validation(message.clone())),
        None => Ok(()),
    }
}
