//! memotrack - Habit tracking on top of memos
//!
//! Habits and daily logs are plain markdown memos tagged with `#habits/...`.
//! Memos come from a memos server (online), local files (offline) or a
//! generated sample set (demo). The habit grid and success rate are derived
//! from those memos on every refresh.

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;

pub use error::MemoTrackError;
