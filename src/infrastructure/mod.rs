//! Infrastructure layer - Memo backends and settings persistence

pub mod config;
pub mod demo;
pub mod offline;
pub mod remote;
pub mod repository;

pub use config::{memos_dir, resolve_data_dir, FileSettingsStore, MemorySettingsStore, Settings};
pub use demo::{demo_memos, InMemoryMemosRepository};
pub use offline::OfflineMemosRepository;
pub use remote::{RemoteCredentialsValidator, RemoteMemosRepository};
pub use repository::{MemosRepository, ModeAwareRepository};
