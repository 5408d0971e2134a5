//! Memoized activity aggregation
//!
//! Results are cached per `(range, display mode)` for one memo generation.
//! Generations are handed out by the cache itself, one per loaded memo list,
//! so features sharing a cache never mix up each other's results. Seeing a
//! newer generation drops every entry at once. Concurrent requests for the
//! same key share one computation.

use crate::domain::{
    calculate_success_rate, ActivityDisplayMode, ActivityRange, ActivitySnapshot,
    ActivityWeekData, SuccessRateData,
};
use crate::error::{MemoTrackError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

pub type ActivityKey = (ActivityRange, ActivityDisplayMode);

/// Aggregation output for one range of one memo generation
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityResult {
    pub generation: u64,
    pub key: ActivityKey,
    pub week_data: Arc<ActivityWeekData>,
    pub success_rate: SuccessRateData,
}

/// Run the aggregation engine for one key
pub fn compute_activity(
    snapshot: &ActivitySnapshot,
    generation: u64,
    key: ActivityKey,
    today: NaiveDate,
) -> ActivityResult {
    let (range, mode) = key;
    let week_data = snapshot.build_week_data(range, mode, today);
    let success_rate =
        calculate_success_rate(&week_data, range, today, snapshot.config_start_date());
    ActivityResult {
        generation,
        key,
        week_data: Arc::new(week_data),
        success_rate,
    }
}

type Slot = Arc<OnceCell<ActivityResult>>;

#[derive(Default)]
struct CacheInner {
    /// Last generation handed out by [`ActivityCache::next_generation`]
    issued: u64,
    generation: u64,
    entries: HashMap<ActivityKey, Slot>,
}

#[derive(Default)]
pub struct ActivityCache {
    inner: Mutex<CacheInner>,
}

impl ActivityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a generation for a freshly loaded memo list
    pub fn next_generation(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.issued += 1;
        inner.issued
    }

    fn slot(&self, generation: u64, key: ActivityKey) -> Slot {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if generation > inner.generation {
            debug!(
                from = inner.generation,
                to = generation,
                dropped = inner.entries.len(),
                "activity cache invalidated"
            );
            inner.entries.clear();
            inner.generation = generation;
        } else if generation < inner.generation {
            // Outdated request: compute but never store
            return Slot::default();
        }

        inner.entries.entry(key).or_default().clone()
    }

    /// Result already computed for `key` in `generation`
    pub fn get(&self, generation: u64, key: ActivityKey) -> Option<ActivityResult> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != generation {
            return None;
        }
        inner.entries.get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Cached result for `key`, computing it on a blocking thread on a miss
    pub async fn get_or_compute(
        &self,
        generation: u64,
        key: ActivityKey,
        snapshot: Arc<ActivitySnapshot>,
        today: NaiveDate,
    ) -> Result<ActivityResult> {
        let slot = self.slot(generation, key);
        let result = slot
            .get_or_try_init(|| async move {
                debug!(range = %key.0, mode = ?key.1, generation, "computing activity");
                tokio::task::spawn_blocking(move || {
                    compute_activity(&snapshot, generation, key, today)
                })
                .await
                .map_err(|e| MemoTrackError::Background(e.to_string()))
            })
            .await?;
        Ok(result.clone())
    }

    pub fn generation(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Number of keys with a slot in the current generation
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Memo;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot() -> Arc<ActivitySnapshot> {
        let memos = vec![
            Memo::new("memos/2", "#habits/daily 2024-01-09\n#habits/exercise")
                .with_create_time(Utc.with_ymd_and_hms(2024, 1, 9, 20, 0, 0).unwrap()),
            Memo::new("memos/1", "#habits/config\nExercise | #habits/exercise")
                .with_create_time(Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap()),
        ];
        Arc::new(ActivitySnapshot::from_memos(
            memos,
            FixedOffset::east_opt(0).unwrap(),
        ))
    }

    fn key() -> ActivityKey {
        (
            ActivityRange::week_containing(date(2024, 1, 10)),
            ActivityDisplayMode::Habits,
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = ActivityCache::new();
        let today = date(2024, 1, 10);
        assert!(cache.get(1, key()).is_none());

        let computed = cache.get_or_compute(1, key(), snapshot(), today).await.unwrap();
        assert_eq!(computed.success_rate.completed, 1);
        assert_eq!(computed.success_rate.total, 3);

        let cached = cache.get(1, key()).unwrap();
        assert!(Arc::ptr_eq(&cached.week_data, &computed.week_data));
    }

    #[tokio::test]
    async fn test_new_generation_invalidates() {
        let cache = ActivityCache::new();
        let today = date(2024, 1, 10);
        cache.get_or_compute(1, key(), snapshot(), today).await.unwrap();
        assert_eq!(cache.len(), 1);

        let other = (key().0, ActivityDisplayMode::Posts);
        cache.get_or_compute(2, other, snapshot(), today).await.unwrap();
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(2, key()).is_none());
    }

    #[tokio::test]
    async fn test_stale_generation_not_stored() {
        let cache = ActivityCache::new();
        let today = date(2024, 1, 10);
        cache.get_or_compute(3, key(), snapshot(), today).await.unwrap();

        let other = (key().0.shift(-1).unwrap(), ActivityDisplayMode::Habits);
        cache.get_or_compute(2, other, snapshot(), today).await.unwrap();
        assert_eq!(cache.generation(), 3);
        assert!(cache.get(3, other).is_none());
    }

    #[test]
    fn test_generations_are_unique() {
        let cache = ActivityCache::new();
        let a = cache.next_generation();
        let b = cache.next_generation();
        assert!(b > a);
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_requests_share_result() {
        let cache = Arc::new(ActivityCache::new());
        let today = date(2024, 1, 10);

        let a = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_compute(1, key(), snapshot(), today).await })
        };
        let b = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_compute(1, key(), snapshot(), today).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a.week_data, &b.week_data));
        assert_eq!(cache.len(), 1);
    }
}
