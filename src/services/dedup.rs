use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Who first used a submission token, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub user_id: String,
    pub first_seen: DateTime<Utc>,
}

/// Storage for submission tokens. The in-memory store below is process-local;
/// a shared TTL store can implement this for multi-instance deployments.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Records `token` for `user_id` unless the same user already used it
    /// within `window` of `now`. Returns `false` for a replay.
    async fn check_and_record(
        &self,
        token: &str,
        user_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool;

    /// Drops records first seen before `cutoff`, returning how many went
    async fn sweep(&self, cutoff: DateTime<Utc>) -> usize;

    async fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryDedupStore {
    records: DashMap<String, SubmissionRecord>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn check_and_record(
        &self,
        token: &str,
        user_id: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        // The entry guard holds the shard lock, so check and insert are atomic
        match self.records.entry(token.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get();
                if existing.user_id == user_id && now - existing.first_seen <= window {
                    return false;
                }
                occupied.insert(SubmissionRecord {
                    user_id: user_id.to_string(),
                    first_seen: now,
                });
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SubmissionRecord {
                    user_id: user_id.to_string(),
                    first_seen: now,
                });
                true
            }
        }
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.first_seen >= cutoff);
        before.saturating_sub(self.records.len())
    }

    async fn len(&self) -> usize {
        self.records.len()
    }
}
