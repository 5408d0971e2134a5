//! In-memory memo store and demo fixtures

use crate::domain::Memo;
use crate::error::{MemoTrackError, Result};
use crate::infrastructure::repository::MemosRepository;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Memo store that only lives as long as the process
///
/// Backs demo mode; writes change the in-memory copy and are never persisted.
pub struct InMemoryMemosRepository {
    memos: RwLock<Vec<Memo>>,
    next_id: AtomicU64,
}

impl InMemoryMemosRepository {
    pub fn new(memos: Vec<Memo>) -> Self {
        InMemoryMemosRepository {
            memos: RwLock::new(memos),
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Memo>> {
        self.memos.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Memo>> {
        self.memos.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl MemosRepository for InMemoryMemosRepository {
    async fn load_memos(&self) -> Result<Vec<Memo>> {
        Ok(self.read().clone())
    }

    async fn create_memo(&self, content: &str) -> Result<Memo> {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let memo = Memo {
            name: format!("memos/local-{}", id),
            content: content.to_string(),
            create_time: Some(now),
            update_time: Some(now),
        };
        self.write().insert(0, memo.clone());
        Ok(memo)
    }

    async fn update_memo(&self, name: &str, content: &str) -> Result<Memo> {
        let mut memos = self.write();
        let memo = memos
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| MemoTrackError::MemoNotFound(name.to_string()))?;
        memo.content = content.to_string();
        memo.update_time = Some(Utc::now());
        Ok(memo.clone())
    }

    async fn delete_memo(&self, name: &str) -> Result<()> {
        let mut memos = self.write();
        let before = memos.len();
        memos.retain(|m| m.name != name);
        if memos.len() == before {
            return Err(MemoTrackError::MemoNotFound(name.to_string()));
        }
        Ok(())
    }
}

const DEMO_HISTORY_DAYS: i64 = 42;

const DEMO_CONFIG: &str = "#habits/config
Exercise | #habits/exercise | #4CAF50
Reading | #habits/reading | #2196F3
Meditation | #habits/meditation | #9C27B0";

const DEMO_POSTS: &[&str] = &[
    "Tried a new **pasta** recipe tonight, would make again.",
    "Finished the first draft of the trip plan.",
    "Long walk by the river. The leaves are turning.",
    "Notes from the book club:\n\n- pacing felt slow\n- great ending",
    "Fixed the squeaky door hinge at last.",
];

fn local_time(date: NaiveDate, hour: u32, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn demo_memo(id: usize, content: String, date: NaiveDate, hour: u32, offset: &FixedOffset) -> Memo {
    let time = local_time(date, hour, offset);
    Memo {
        name: format!("memos/demo-{}", id),
        content,
        create_time: time,
        update_time: time,
    }
}

/// Which demo habits were done `days_ago` days before today
fn demo_completions(days_ago: i64) -> Vec<&'static str> {
    let mut done = Vec::new();
    if days_ago % 2 == 0 {
        done.push("#habits/exercise");
    }
    if days_ago % 3 != 0 {
        done.push("#habits/reading");
    }
    if days_ago % 5 != 1 {
        done.push("#habits/meditation");
    }
    done
}

fn demo_daily_content(date: NaiveDate, days_ago: i64) -> String {
    let done = demo_completions(days_ago);
    let mut lines = vec![format!("#habits/daily {}", date.format("%Y-%m-%d"))];

    // Alternate weeks use checkbox lists instead of bare tags
    if (days_ago / 7) % 2 == 1 {
        for tag in ["#habits/exercise", "#habits/reading", "#habits/meditation"] {
            let mark = if done.contains(&tag) { 'x' } else { ' ' };
            lines.push(format!("- [{}] {}", mark, tag));
        }
    } else {
        lines.extend(done.iter().map(|tag| tag.to_string()));
    }

    lines.join("\n")
}

/// Demo data anchored on `today`: a habit config, six weeks of daily logs
/// (nothing logged for today yet) and a few plain posts. Newest first.
pub fn demo_memos(today: NaiveDate, offset: &FixedOffset) -> Vec<Memo> {
    let mut memos = Vec::new();
    let mut id = 0;

    let config_date = today - Duration::days(DEMO_HISTORY_DAYS);
    memos.push(demo_memo(id, DEMO_CONFIG.to_string(), config_date, 8, offset));

    for days_ago in (1..=DEMO_HISTORY_DAYS).rev() {
        let date = today - Duration::days(days_ago);
        id += 1;
        memos.push(demo_memo(id, demo_daily_content(date, days_ago), date, 21, offset));

        if days_ago % 4 == 0 {
            let post = DEMO_POSTS[(days_ago as usize / 4) % DEMO_POSTS.len()];
            id += 1;
            memos.push(demo_memo(id, post.to_string(), date, 12, offset));
        }
    }

    memos.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    memos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::habits::parser::{daily_memo_date, is_daily_memo, is_habits_config_memo};
    use crate::domain::ActivitySnapshot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_crud() {
        let repo = InMemoryMemosRepository::new(Vec::new());

        let memo = repo.create_memo("hello").await.unwrap();
        assert_eq!(repo.load_memos().await.unwrap().len(), 1);

        let updated = repo.update_memo(&memo.name, "hello again").await.unwrap();
        assert_eq!(updated.content, "hello again");

        repo.delete_memo(&memo.name).await.unwrap();
        assert!(repo.load_memos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_missing_memo() {
        let repo = InMemoryMemosRepository::new(Vec::new());
        assert!(matches!(
            repo.update_memo("memos/none", "x").await,
            Err(MemoTrackError::MemoNotFound(_))
        ));
        assert!(matches!(
            repo.delete_memo("memos/none").await,
            Err(MemoTrackError::MemoNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_created_memo_listed_first() {
        let repo = InMemoryMemosRepository::new(vec![Memo::new("memos/old", "old")]);
        repo.create_memo("new").await.unwrap();
        assert_eq!(repo.load_memos().await.unwrap()[0].content, "new");
    }

    #[test]
    fn test_demo_memos_shape() {
        let today = date(2024, 3, 15);
        let memos = demo_memos(today, &utc());

        let configs = memos.iter().filter(|m| is_habits_config_memo(&m.content)).count();
        let dailies: Vec<_> = memos.iter().filter(|m| is_daily_memo(&m.content)).collect();
        assert_eq!(configs, 1);
        assert_eq!(dailies.len(), DEMO_HISTORY_DAYS as usize);
        assert!(dailies
            .iter()
            .all(|m| daily_memo_date(&m.content).unwrap() < today));
        assert!(memos.iter().any(|m| !m.is_habit_memo()));
    }

    #[test]
    fn test_demo_memos_newest_first() {
        let memos = demo_memos(date(2024, 3, 15), &utc());
        assert!(memos
            .windows(2)
            .all(|pair| pair[0].timestamp() >= pair[1].timestamp()));
    }

    #[test]
    fn test_demo_snapshot_has_habits() {
        let today = date(2024, 3, 15);
        let snapshot = ActivitySnapshot::from_memos(demo_memos(today, &utc()), utc());
        assert_eq!(
            snapshot.config_start_date(),
            Some(today - Duration::days(DEMO_HISTORY_DAYS))
        );
        assert_eq!(snapshot.habits_for_date(today).len(), 3);
        assert_eq!(snapshot.daily_memos.len(), DEMO_HISTORY_DAYS as usize);
    }

    #[test]
    fn test_checkbox_weeks_mark_unchecked() {
        let content = demo_daily_content(date(2024, 3, 6), 9);
        assert!(content.contains("- [ ] #habits/exercise"));
        assert!(content.contains("- [ ] #habits/reading"));
        assert!(content.contains("- [x] #habits/meditation"));
    }
}
