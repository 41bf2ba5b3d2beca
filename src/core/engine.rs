use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::core::clock::{Clock, SystemClock};
use crate::core::queue::WaitQueue;
use crate::models::{
    ChatMode, Gender, MatchOutcome, MatchPreferences, MatchRequest, QueueStats, Session,
};
use crate::services::SessionStore;

/// How many past partners per user are excluded from re-pairing.
const MAX_RECENT_PARTNERS: usize = 5;
/// How long a past pairing keeps two users apart.
const RECENT_PARTNER_TTL: Duration = Duration::from_secs(5 * 60);

/// Errors surfaced to callers of the matching engine.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("user {0} already has a pending match request")]
    DuplicateRequest(String),

    #[error("unknown chat mode: {0}")]
    InvalidMode(String),

    #[error("invalid preference value: {0}")]
    InvalidPreference(String),
}

/// Timing thresholds for queue membership.
///
/// `match_timeout` is the soft threshold: entries older than it are no longer
/// offered as partners. `max_wait` is the hard threshold: entries older than
/// it are evicted outright. The soft threshold must stay below the hard one;
/// configuration loading enforces this.
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    pub match_timeout: Duration,
    pub max_wait: Duration,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            match_timeout: Duration::from_secs(120),
            max_wait: Duration::from_secs(300),
        }
    }
}

struct RecentPartner {
    partner_id: String,
    paired_at: Instant,
}

/// The matchmaking orchestrator.
///
/// Owns one wait queue per chat mode, each behind its own lock, plus a
/// cross-mode registry enforcing the one-outstanding-request-per-user rule.
/// The compatibility scan and the removal of the selected peer run inside a
/// single critical section on the mode's queue, so a waiting entry can be
/// handed to at most one caller. No two engine locks are ever held at the
/// same time, and no lock is held across an await point.
pub struct MatchingEngine {
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SessionStore>,
    queues: [Mutex<WaitQueue>; ChatMode::COUNT],
    /// user id -> mode of their single outstanding request.
    pending: Mutex<HashMap<String, ChatMode>>,
    /// user id -> partners paired within the last few minutes, oldest first.
    recent_partners: Mutex<HashMap<String, Vec<RecentPartner>>>,
    weak_self: Weak<MatchingEngine>,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig, store: Arc<dyn SessionStore>) -> Arc<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Construct with an explicit clock, for deterministic tests.
    pub fn with_clock(
        config: MatchingConfig,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        debug_assert!(config.match_timeout < config.max_wait);
        Arc::new_cyclic(|weak| Self {
            config,
            clock,
            store,
            queues: std::array::from_fn(|_| Mutex::new(WaitQueue::new())),
            pending: Mutex::new(HashMap::new()),
            recent_partners: Mutex::new(HashMap::new()),
            weak_self: weak.clone(),
        })
    }

    /// Pair `user_id` with a waiting peer in `mode`, or enqueue them.
    ///
    /// On a pairing, the peer is removed from the queue before the session is
    /// emitted; session persistence runs after the queue lock is released and
    /// a storage failure never unwinds the pairing. On enqueue, a per-request
    /// expiry timer is scheduled; the janitor sweep backs it up.
    pub async fn request_match(
        &self,
        user_id: &str,
        mode: ChatMode,
        preferences: MatchPreferences,
        user_gender: Option<Gender>,
    ) -> Result<MatchOutcome, MatchError> {
        let now = self.clock.now();
        let request = MatchRequest {
            user_id: user_id.to_string(),
            mode,
            preferences,
            user_gender,
            enqueued_at: now,
        };

        // Reserve the user's single outstanding slot across all modes before
        // touching any queue.
        {
            let mut pending = self.pending.lock().expect("pending registry poisoned");
            if pending.contains_key(user_id) {
                return Err(MatchError::DuplicateRequest(user_id.to_string()));
            }
            pending.insert(user_id.to_string(), mode);
        }

        let excluded = self.recent_partners_of(user_id, now);

        let paired: Option<MatchRequest>;
        let position: usize;
        {
            let mut queue = self.queues[mode.index()].lock().expect("queue lock poisoned");
            let found = queue
                .find_compatible(&request, now, self.config.match_timeout, &excluded)
                .map(|peer| peer.user_id.clone());
            match found {
                Some(peer_id) => {
                    paired = queue.remove(&peer_id);
                    position = 0;
                }
                None => match queue.enqueue(request) {
                    Ok(()) => {
                        paired = None;
                        position = queue.len();
                    }
                    Err(err) => {
                        drop(queue);
                        self.pending
                            .lock()
                            .expect("pending registry poisoned")
                            .remove(user_id);
                        return Err(MatchError::DuplicateRequest(err.user_id));
                    }
                },
            }
        }

        if let Some(peer) = paired {
            {
                let mut pending = self.pending.lock().expect("pending registry poisoned");
                pending.remove(user_id);
                pending.remove(&peer.user_id);
            }
            self.record_partners(user_id, &peer.user_id, now);

            let session = Session {
                session_id: Uuid::new_v4().to_string(),
                user_id_a: user_id.to_string(),
                user_id_b: peer.user_id.clone(),
                mode,
                started_at: chrono::Utc::now(),
            };

            tracing::info!(
                "paired {} with {} in {} (peer waited {:?})",
                user_id,
                peer.user_id,
                mode,
                peer.age(now)
            );

            // The pairing is final once the queue removal committed; the store
            // retries on its side.
            if let Err(e) = self.store.create_session(&session).await {
                tracing::error!("failed to persist session {}: {}", session.session_id, e);
            }

            return Ok(MatchOutcome::Matched { session });
        }

        self.schedule_expiry(user_id.to_string(), mode);
        tracing::debug!("queued {} for {} at position {}", user_id, mode, position);
        Ok(MatchOutcome::Queued {
            position,
            estimated_wait_secs: estimate_wait_secs(position),
        })
    }

    /// Withdraw a pending request.
    ///
    /// Idempotent: cancelling a user who was never queued, was already
    /// matched, or was already cancelled removes nothing and returns `false`.
    pub fn cancel(&self, user_id: &str, mode: ChatMode) -> bool {
        let removed = self.queues[mode.index()]
            .lock()
            .expect("queue lock poisoned")
            .remove(user_id);
        match removed {
            Some(_) => {
                self.pending
                    .lock()
                    .expect("pending registry poisoned")
                    .remove(user_id);
                tracing::debug!("cancelled pending request for {} in {}", user_id, mode);
                true
            }
            None => false,
        }
    }

    /// Drop every waiting request older than the hard wait limit.
    ///
    /// Returns the number of evicted entries. The janitor calls this on its
    /// interval; it is also the manual entry point for tests and operations.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut total = 0;

        for mode in ChatMode::ALL {
            let evicted = self.queues[mode.index()]
                .lock()
                .expect("queue lock poisoned")
                .evict_expired(self.config.max_wait, now);
            if evicted.is_empty() {
                continue;
            }

            {
                let mut pending = self.pending.lock().expect("pending registry poisoned");
                for request in &evicted {
                    pending.remove(&request.user_id);
                }
            }
            tracing::debug!("evicted {} expired request(s) from the {} queue", evicted.len(), mode);
            total += evicted.len();
        }

        self.prune_recent_partners(now);
        total
    }

    /// Waiting counts per mode.
    pub fn queue_stats(&self) -> QueueStats {
        let text = self.queues[ChatMode::Text.index()]
            .lock()
            .expect("queue lock poisoned")
            .len();
        let audio = self.queues[ChatMode::Audio.index()]
            .lock()
            .expect("queue lock poisoned")
            .len();
        let video = self.queues[ChatMode::Video.index()]
            .lock()
            .expect("queue lock poisoned")
            .len();
        QueueStats {
            text,
            audio,
            video,
            total: text + audio + video,
        }
    }

    /// 1-based position of a waiting user in their mode queue.
    pub fn queue_position(&self, user_id: &str, mode: ChatMode) -> Option<usize> {
        self.queues[mode.index()]
            .lock()
            .expect("queue lock poisoned")
            .position(user_id)
            .map(|idx| idx + 1)
    }

    /// Fast-path expiry for a queued request. `cancel` is idempotent, so a
    /// timer firing after a match or an explicit cancel is a no-op. The
    /// janitor sweep remains the durable guarantee if the timer is lost.
    fn schedule_expiry(&self, user_id: String, mode: ChatMode) {
        let Some(engine) = self.weak_self.upgrade() else {
            return;
        };
        let max_wait = self.config.max_wait;
        tokio::spawn(async move {
            tokio::time::sleep(max_wait).await;
            if engine.cancel(&user_id, mode) {
                tracing::info!("request for {} in {} expired after {:?}", user_id, mode, max_wait);
            }
        });
    }

    fn recent_partners_of(&self, user_id: &str, now: Instant) -> Vec<String> {
        let partners = self
            .recent_partners
            .lock()
            .expect("recent partners poisoned");
        partners
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|p| now.saturating_duration_since(p.paired_at) < RECENT_PARTNER_TTL)
                    .map(|p| p.partner_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record_partners(&self, a: &str, b: &str, now: Instant) {
        let mut partners = self
            .recent_partners
            .lock()
            .expect("recent partners poisoned");
        for (user, partner) in [(a, b), (b, a)] {
            let list = partners.entry(user.to_string()).or_default();
            list.retain(|p| now.saturating_duration_since(p.paired_at) < RECENT_PARTNER_TTL);
            list.push(RecentPartner {
                partner_id: partner.to_string(),
                paired_at: now,
            });
            if list.len() > MAX_RECENT_PARTNERS {
                list.remove(0);
            }
        }
    }

    fn prune_recent_partners(&self, now: Instant) {
        let mut partners = self
            .recent_partners
            .lock()
            .expect("recent partners poisoned");
        partners.retain(|_, list| {
            list.retain(|p| now.saturating_duration_since(p.paired_at) < RECENT_PARTNER_TTL);
            !list.is_empty()
        });
    }
}

/// Rough wait estimate from queue position, assuming a pairing every couple
/// of seconds.
fn estimate_wait_secs(position: usize) -> u64 {
    if position <= 1 {
        1
    } else {
        (position as u64 / 2) * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::models::GenderPreference;
    use crate::services::MemorySessionStore;

    fn engine_with_memory_store() -> (Arc<MatchingEngine>, Arc<MemorySessionStore>, Arc<ManualClock>) {
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::new());
        let engine = MatchingEngine::with_clock(
            MatchingConfig::default(),
            store.clone(),
            clock.clone(),
        );
        (engine, store, clock)
    }

    fn open_preferences() -> MatchPreferences {
        MatchPreferences::default()
    }

    #[tokio::test]
    async fn test_first_request_is_queued() {
        let (engine, _, _) = engine_with_memory_store();
        let outcome = engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        match outcome {
            MatchOutcome::Queued { position, .. } => assert_eq!(position, 1),
            other => panic!("expected queued, got {:?}", other),
        }
        assert_eq!(engine.queue_stats().text, 1);
    }

    #[tokio::test]
    async fn test_second_compatible_request_pairs() {
        let (engine, store, _) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Video, open_preferences(), None)
            .await
            .unwrap();
        let outcome = engine
            .request_match("b", ChatMode::Video, open_preferences(), None)
            .await
            .unwrap();

        let session = match outcome {
            MatchOutcome::Matched { session } => session,
            other => panic!("expected matched, got {:?}", other),
        };
        assert_eq!(session.mode, ChatMode::Video);
        assert_eq!(session.user_id_a, "b");
        assert_eq!(session.user_id_b, "a");
        assert_eq!(engine.queue_stats().total, 0);
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_modes_are_partitioned() {
        let (engine, _, _) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();
        let outcome = engine
            .request_match("b", ChatMode::Audio, open_preferences(), None)
            .await
            .unwrap();

        assert!(matches!(outcome, MatchOutcome::Queued { .. }));
        let stats = engine.queue_stats();
        assert_eq!(stats.text, 1);
        assert_eq!(stats.audio, 1);
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected_across_modes() {
        let (engine, _, _) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        let err = engine
            .request_match("a", ChatMode::Video, open_preferences(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::DuplicateRequest(_)));
        assert_eq!(engine.queue_stats().total, 1);
    }

    #[tokio::test]
    async fn test_cancel_frees_the_user_for_a_new_request() {
        let (engine, _, _) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        assert!(engine.cancel("a", ChatMode::Text));
        assert!(!engine.cancel("a", ChatMode::Text));

        let outcome = engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, MatchOutcome::Queued { .. }));
    }

    #[tokio::test]
    async fn test_stale_entries_are_not_offered() {
        let (engine, _, clock) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(121));
        let outcome = engine
            .request_match("b", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        // a is past the match timeout: still counted, no longer pairable.
        assert!(matches!(outcome, MatchOutcome::Queued { .. }));
        assert_eq!(engine.queue_stats().text, 2);
    }

    #[tokio::test]
    async fn test_evict_expired_clears_old_entries() {
        let (engine, _, clock) = engine_with_memory_store();
        engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(300));
        assert_eq!(engine.evict_expired(), 1);
        assert_eq!(engine.queue_stats().total, 0);

        // The evicted user may request again.
        let outcome = engine
            .request_match("a", ChatMode::Text, open_preferences(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, MatchOutcome::Queued { .. }));
    }

    #[tokio::test]
    async fn test_queue_position_reflects_arrival_order() {
        let (engine, _, _) = engine_with_memory_store();
        // Same gender and a targeted preference, so none of them pair up.
        for id in ["a", "b", "c"] {
            engine
                .request_match(
                    id,
                    ChatMode::Text,
                    MatchPreferences {
                        gender_preference: GenderPreference::Female,
                        ..MatchPreferences::default()
                    },
                    Some(Gender::Male),
                )
                .await
                .unwrap();
        }

        assert_eq!(engine.queue_position("a", ChatMode::Text), Some(1));
        assert_eq!(engine.queue_position("c", ChatMode::Text), Some(3));
        assert_eq!(engine.queue_position("ghost", ChatMode::Text), None);
    }

    #[test]
    fn test_estimate_wait_secs() {
        assert_eq!(estimate_wait_secs(1), 1);
        assert_eq!(estimate_wait_secs(2), 2);
        assert_eq!(estimate_wait_secs(3), 2);
        assert_eq!(estimate_wait_secs(4), 4);
        assert_eq!(estimate_wait_secs(5), 4);
    }
}
