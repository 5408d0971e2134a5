//! Offline memo store
//!
//! One TOML document per memo under `<data dir>/memos/`, named after the
//! memo id (`memos/<id>` is stored as `<id>.toml`).

use crate::domain::Memo;
use crate::error::{MemoTrackError, Result};
use crate::infrastructure::repository::MemosRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const MEMO_NAME_PREFIX: &str = "memos/";
const MEMO_FILE_EXTENSION: &str = "toml";

/// File system implementation of MemosRepository
#[derive(Debug, Clone)]
pub struct OfflineMemosRepository {
    pub root: PathBuf,
}

impl OfflineMemosRepository {
    /// Create a store rooted at `root` (created lazily on first write)
    pub fn new(root: PathBuf) -> Self {
        OfflineMemosRepository { root }
    }

    /// Resolve a memo name to its file, rejecting anything that would escape the root
    fn memo_path(&self, name: &str) -> Result<PathBuf> {
        let id = name.strip_prefix(MEMO_NAME_PREFIX).unwrap_or(name);
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MemoTrackError::MemoNotFound(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", id, MEMO_FILE_EXTENSION)))
    }

    fn read_memo(path: &Path) -> Result<Memo> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Write a memo using a best-effort atomic replace:
    /// write to a temp file in the same directory, then rename into place.
    fn write_memo_atomic(&self, memo: &Memo) -> Result<()> {
        let path = self.memo_path(&memo.name)?;

        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }

        // One temp file per write, even for the same memo
        let tmp_name = format!(
            "{}.tmp-{}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("memo.toml"),
            uuid::Uuid::new_v4().simple()
        );
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, toml::to_string_pretty(memo)?)?;

        // Windows rename does not overwrite
        #[cfg(windows)]
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MemoTrackError::Io(e)),
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// All stored memos, newest first. Unreadable files are skipped.
    pub fn list_memos(&self) -> Result<Vec<Memo>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut memos = Vec::new();

        for entry in WalkDir::new(&self.root).max_depth(1) {
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MEMO_FILE_EXTENSION) {
                continue;
            }
            match Self::read_memo(path) {
                Ok(memo) => memos.push(memo),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable memo file"),
            }
        }

        // Newest first, undated last
        memos.sort_by(|a, b| match (a.timestamp(), b.timestamp()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });

        Ok(memos)
    }

    pub fn insert_memo(&self, content: &str) -> Result<Memo> {
        let now = Utc::now();
        let memo = Memo {
            name: format!("{}{}", MEMO_NAME_PREFIX, uuid::Uuid::new_v4().simple()),
            content: content.to_string(),
            create_time: Some(now),
            update_time: Some(now),
        };
        self.write_memo_atomic(&memo)?;
        info!(memo = %memo.name, "created offline memo");
        Ok(memo)
    }

    pub fn replace_memo(&self, name: &str, content: &str) -> Result<Memo> {
        let path = self.memo_path(name)?;
        if !path.exists() {
            return Err(MemoTrackError::MemoNotFound(name.to_string()));
        }

        let mut memo = Self::read_memo(&path)?;
        memo.content = content.to_string();
        memo.update_time = Some(Utc::now());
        self.write_memo_atomic(&memo)?;
        Ok(memo)
    }

    pub fn remove_memo(&self, name: &str) -> Result<()> {
        let path = self.memo_path(name)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MemoTrackError::MemoNotFound(name.to_string())
            } else {
                MemoTrackError::Io(e)
            }
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(OfflineMemosRepository) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| MemoTrackError::Background(e.to_string()))?
    }
}

#[async_trait]
impl MemosRepository for OfflineMemosRepository {
    async fn load_memos(&self) -> Result<Vec<Memo>> {
        self.blocking(|store| store.list_memos()).await
    }

    async fn create_memo(&self, content: &str) -> Result<Memo> {
        let content = content.to_string();
        self.blocking(move |store| store.insert_memo(&content)).await
    }

    async fn update_memo(&self, name: &str, content: &str) -> Result<Memo> {
        let name = name.to_string();
        let content = content.to_string();
        self.blocking(move |store| store.replace_memo(&name, &content))
            .await
    }

    async fn delete_memo(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.blocking(move |store| store.remove_memo(&name)).await
    }
}
