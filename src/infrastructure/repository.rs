//! Memo repositories and the mode-aware facade

use crate::application::ports::ModeSwitcher;
use crate::domain::{AppMode, Credentials, Memo};
use crate::error::{MemoTrackError, Result};
use crate::infrastructure::remote::RemoteMemosRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Abstract memo source
#[async_trait]
pub trait MemosRepository: Send + Sync {
    /// All memos, newest first
    async fn load_memos(&self) -> Result<Vec<Memo>>;

    /// Create a memo with the given content and return it as stored
    async fn create_memo(&self, content: &str) -> Result<Memo>;

    /// Replace the content of an existing memo
    async fn update_memo(&self, name: &str, content: &str) -> Result<Memo>;

    async fn delete_memo(&self, name: &str) -> Result<()>;
}

/// Routes every call to the backend of the current [`AppMode`]
///
/// The mode is read on each call, so switching modes takes effect for
/// in-flight features without rebuilding them.
pub struct ModeAwareRepository {
    online: Arc<RemoteMemosRepository>,
    offline: Arc<dyn MemosRepository>,
    demo: Arc<dyn MemosRepository>,
    mode: watch::Sender<AppMode>,
}

impl ModeAwareRepository {
    pub fn new(
        online: Arc<RemoteMemosRepository>,
        offline: Arc<dyn MemosRepository>,
        demo: Arc<dyn MemosRepository>,
        mode: AppMode,
    ) -> Self {
        let (mode, _) = watch::channel(mode);
        ModeAwareRepository {
            online,
            offline,
            demo,
            mode,
        }
    }

    pub fn mode(&self) -> AppMode {
        *self.mode.borrow()
    }

    pub fn set_mode(&self, mode: AppMode) {
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "switched app mode");
        }
    }

    /// Watch mode changes
    pub fn subscribe(&self) -> watch::Receiver<AppMode> {
        self.mode.subscribe()
    }

    fn active(&self) -> Result<Arc<dyn MemosRepository>> {
        let mode = self.mode();
        debug!(%mode, "selecting memo backend");
        match mode {
            AppMode::NotSelected => Err(MemoTrackError::ModeNotSelected),
            AppMode::Online => Ok(self.online.clone()),
            AppMode::Offline => Ok(self.offline.clone()),
            AppMode::Demo => Ok(self.demo.clone()),
        }
    }
}

#[async_trait]
impl MemosRepository for ModeAwareRepository {
    async fn load_memos(&self) -> Result<Vec<Memo>> {
        self.active()?.load_memos().await
    }

    async fn create_memo(&self, content: &str) -> Result<Memo> {
        self.active()?.create_memo(content).await
    }

    async fn update_memo(&self, name: &str, content: &str) -> Result<Memo> {
        self.active()?.update_memo(name, content).await
    }

    async fn delete_memo(&self, name: &str) -> Result<()> {
        self.active()?.delete_memo(name).await
    }
}

impl ModeSwitcher for ModeAwareRepository {
    fn switch_mode(&self, mode: AppMode, credentials: Option<Credentials>) {
        if credentials.is_some() || mode == AppMode::NotSelected {
            self.online.set_credentials(credentials);
        }
        self.set_mode(mode);
    }
}
