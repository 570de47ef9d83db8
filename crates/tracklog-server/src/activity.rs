//! In-memory activity log.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracklog_core::Identity;
use tracklog_proto::{ActivityRequest, ActivityResponse};

/// Append-only activity log, read newest first.
pub struct ActivityStore {
    entries: RwLock<Vec<ActivityResponse>>,
    next_id: AtomicU64,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Record an activity performed by `identity` at `at`.
    pub fn log(
        &self,
        identity: &Identity,
        request: ActivityRequest,
        at: DateTime<Utc>,
    ) -> ActivityResponse {
        let activity = ActivityResponse {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: identity.user_id,
            username: identity.subject.clone(),
            action: request.action,
            details: request.details,
            timestamp: at,
        };

        self.entries.write().push(activity.clone());

        tracing::debug!(
            activity_id = activity.id,
            user_id = activity.user_id,
            action = %activity.action,
            "activity logged"
        );
        activity
    }

    /// The `limit` most recent activities.
    pub fn recent(&self, limit: usize) -> Vec<ActivityResponse> {
        self.filtered(|_| true).into_iter().take(limit).collect()
    }

    /// All activities.
    pub fn all(&self) -> Vec<ActivityResponse> {
        self.filtered(|_| true)
    }

    /// Activities of one user.
    pub fn by_user(&self, user_id: u64) -> Vec<ActivityResponse> {
        self.filtered(|a| a.user_id == user_id)
    }

    /// Activities with `start <= timestamp <= end`, optionally for one user.
    pub fn search(
        &self,
        user_id: Option<u64>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ActivityResponse> {
        self.filtered(|a| {
            user_id.map_or(true, |id| a.user_id == id) && a.timestamp >= start && a.timestamp <= end
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Matching entries, newest first. Ties on timestamp go to the later id.
    fn filtered(&self, keep: impl Fn(&ActivityResponse) -> bool) -> Vec<ActivityResponse> {
        let mut matches: Vec<ActivityResponse> = self
            .entries
            .read()
            .iter()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        matches
    }
}

impl Default for ActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklog_core::Role;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn seeded() -> ActivityStore {
        let store = ActivityStore::new();
        let alice = Identity::new(1, "alice", vec![Role::User]);
        let bob = Identity::new(2, "bob", vec![Role::User]);

        store.log(&alice, ActivityRequest::new("login", "web"), at(0));
        store.log(&bob, ActivityRequest::new("login", "mobile"), at(10));
        store.log(&alice, ActivityRequest::new("upload", "report.pdf"), at(20));
        store
    }

    #[test]
    fn test_log_attributes_identity() {
        let store = seeded();
        let latest = &store.recent(1)[0];
        assert_eq!(latest.id, 3);
        assert_eq!(latest.user_id, 1);
        assert_eq!(latest.username, "alice");
        assert_eq!(latest.action, "upload");
    }

    #[test]
    fn test_recent_newest_first() {
        let store = seeded();
        let ids: Vec<u64> = store.recent(10).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(store.recent(2).len(), 2);
    }

    #[test]
    fn test_by_user() {
        let store = seeded();
        let ids: Vec<u64> = store.by_user(1).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(store.by_user(99).is_empty());
    }

    #[test]
    fn test_search_inclusive_range() {
        let store = seeded();

        let ids: Vec<u64> = store.search(None, at(0), at(10)).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let ids: Vec<u64> = store
            .search(Some(1), at(5), at(20))
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![3]);

        assert!(store.search(None, at(30), at(40)).is_empty());
    }
}
