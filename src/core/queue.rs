use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::compatibility::gender_compatible;
use crate::models::MatchRequest;

/// A user already has an entry in this queue.
#[derive(Debug, Error)]
#[error("user {user_id} is already waiting in this queue")]
pub struct DuplicateUserError {
    pub user_id: String,
}

/// Ordered multiset of waiting requests for a single chat mode, oldest first.
///
/// The queue only orders and filters entries; the one-request-per-user rule
/// across modes and the pairing decision live in the engine.
#[derive(Debug, Default)]
pub struct WaitQueue {
    entries: Vec<MatchRequest>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.iter().any(|entry| entry.user_id == user_id)
    }

    /// 0-based scan position of a waiting user.
    pub fn position(&self, user_id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.user_id == user_id)
    }

    /// Insert a request, keeping entries ordered by `enqueued_at` ascending.
    ///
    /// Requests normally arrive in timestamp order, so this is an append;
    /// equal timestamps (manual clocks) keep insertion order.
    pub fn enqueue(&mut self, request: MatchRequest) -> Result<(), DuplicateUserError> {
        if self.contains(&request.user_id) {
            return Err(DuplicateUserError {
                user_id: request.user_id,
            });
        }

        let at = self
            .entries
            .iter()
            .position(|entry| entry.enqueued_at > request.enqueued_at)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, request);
        Ok(())
    }

    /// Remove the entry for `user_id`, returning it. Absent is a no-op.
    pub fn remove(&mut self, user_id: &str) -> Option<MatchRequest> {
        let idx = self.position(user_id)?;
        Some(self.entries.remove(idx))
    }

    /// Oldest waiting entry compatible with `candidate`.
    ///
    /// Skips the candidate's own id, entries at least `freshness` old (stale,
    /// awaiting eviction), and `excluded` ids (recent partners). The first
    /// hit in scan order is the longest-waiting compatible entry; timestamp
    /// ties resolve by insertion order. Nothing is removed here — the caller
    /// removes the selected peer under the same lock.
    pub fn find_compatible(
        &self,
        candidate: &MatchRequest,
        now: Instant,
        freshness: Duration,
        excluded: &[String],
    ) -> Option<&MatchRequest> {
        self.entries.iter().find(|entry| {
            entry.user_id != candidate.user_id
                && entry.age(now) < freshness
                && !excluded.iter().any(|id| *id == entry.user_id)
                && gender_compatible(candidate, entry)
        })
    }

    /// Remove every entry whose age reaches `max_age`, returning them.
    ///
    /// Entries are ordered oldest first, so the expired set is a prefix.
    pub fn evict_expired(&mut self, max_age: Duration, now: Instant) -> Vec<MatchRequest> {
        let keep_from = self
            .entries
            .iter()
            .position(|entry| entry.age(now) < max_age)
            .unwrap_or(self.entries.len());
        self.entries.drain(..keep_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMode, Gender, GenderPreference, MatchPreferences};

    const FRESH: Duration = Duration::from_secs(120);
    const MAX_AGE: Duration = Duration::from_secs(300);

    fn request(id: &str, enqueued_at: Instant) -> MatchRequest {
        MatchRequest {
            user_id: id.to_string(),
            mode: ChatMode::Text,
            preferences: MatchPreferences::default(),
            user_gender: None,
            enqueued_at,
        }
    }

    fn picky_request(
        id: &str,
        preference: GenderPreference,
        gender: Option<Gender>,
        enqueued_at: Instant,
    ) -> MatchRequest {
        MatchRequest {
            user_id: id.to_string(),
            mode: ChatMode::Text,
            preferences: MatchPreferences {
                gender_preference: preference,
                ..MatchPreferences::default()
            },
            user_gender: gender,
            enqueued_at,
        }
    }

    #[test]
    fn test_enqueue_rejects_duplicate_user() {
        let now = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("a", now)).unwrap();

        let err = queue.enqueue(request("a", now)).unwrap_err();
        assert_eq!(err.user_id, "a");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let now = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("a", now)).unwrap();

        assert!(queue.remove("a").is_some());
        assert!(queue.remove("a").is_none());
        assert!(queue.remove("never-queued").is_none());
    }

    #[test]
    fn test_find_prefers_longest_waiting() {
        let base = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("old", base)).unwrap();
        queue
            .enqueue(request("newer", base + Duration::from_secs(1)))
            .unwrap();
        queue
            .enqueue(request("newest", base + Duration::from_secs(2)))
            .unwrap();

        let candidate = request("candidate", base + Duration::from_secs(3));
        let found = queue
            .find_compatible(&candidate, base + Duration::from_secs(3), FRESH, &[])
            .unwrap();
        assert_eq!(found.user_id, "old");
    }

    #[test]
    fn test_find_breaks_timestamp_ties_by_insertion_order() {
        let base = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("first", base)).unwrap();
        queue.enqueue(request("second", base)).unwrap();

        let candidate = request("candidate", base);
        let found = queue.find_compatible(&candidate, base, FRESH, &[]).unwrap();
        assert_eq!(found.user_id, "first");
    }

    #[test]
    fn test_find_excludes_self() {
        let now = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("a", now)).unwrap();

        // Even if the candidate somehow appears in its own scan, it is skipped.
        let candidate = request("a", now);
        assert!(queue.find_compatible(&candidate, now, FRESH, &[]).is_none());
    }

    #[test]
    fn test_find_skips_stale_entries() {
        let base = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("stale", base)).unwrap();

        let now = base + FRESH;
        let candidate = request("candidate", now);
        assert!(queue.find_compatible(&candidate, now, FRESH, &[]).is_none());

        // Still a member until evicted.
        assert!(queue.contains("stale"));
    }

    #[test]
    fn test_find_skips_excluded_ids() {
        let now = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("recent-partner", now)).unwrap();
        queue.enqueue(request("fresh-face", now)).unwrap();

        let candidate = request("candidate", now);
        let excluded = vec!["recent-partner".to_string()];
        let found = queue
            .find_compatible(&candidate, now, FRESH, &excluded)
            .unwrap();
        assert_eq!(found.user_id, "fresh-face");
    }

    #[test]
    fn test_find_applies_gender_gate() {
        let now = Instant::now();
        let mut queue = WaitQueue::new();
        queue
            .enqueue(picky_request(
                "wants-female",
                GenderPreference::Female,
                Some(Gender::Female),
                now,
            ))
            .unwrap();

        let male = picky_request("male", GenderPreference::Any, Some(Gender::Male), now);
        assert!(queue.find_compatible(&male, now, FRESH, &[]).is_none());

        let female = picky_request("female", GenderPreference::Any, Some(Gender::Female), now);
        assert_eq!(
            queue
                .find_compatible(&female, now, FRESH, &[])
                .unwrap()
                .user_id,
            "wants-female"
        );
    }

    #[test]
    fn test_evict_expired_removes_prefix_at_threshold() {
        let base = Instant::now();
        let mut queue = WaitQueue::new();
        queue.enqueue(request("expired", base)).unwrap();
        queue
            .enqueue(request("on-the-edge", base + Duration::from_secs(1)))
            .unwrap();
        queue
            .enqueue(request("young", base + Duration::from_secs(200)))
            .unwrap();

        // Age exactly max_age counts as expired.
        let now = base + Duration::from_secs(1) + MAX_AGE;
        let evicted = queue.evict_expired(MAX_AGE, now);
        let ids: Vec<&str> = evicted.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["expired", "on-the-edge"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains("young"));
    }

    #[test]
    fn test_evict_expired_empty_queue() {
        let mut queue = WaitQueue::new();
        assert!(queue.evict_expired(MAX_AGE, Instant::now()).is_empty());
    }
}
