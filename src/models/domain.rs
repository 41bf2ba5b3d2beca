use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Chat medium. Each mode has its own wait queue and matching never crosses
/// modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Text,
    Audio,
    Video,
}

impl ChatMode {
    pub const ALL: [ChatMode; 3] = [ChatMode::Text, ChatMode::Audio, ChatMode::Video];
    pub const COUNT: usize = 3;

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Text => "text",
            ChatMode::Audio => "audio",
            ChatMode::Video => "video",
        }
    }

    /// Parse the lowercase wire form. Unknown strings are rejected at the
    /// boundary, before any queue interaction.
    pub fn parse(s: &str) -> Option<ChatMode> {
        match s {
            "text" => Some(ChatMode::Text),
            "audio" => Some(ChatMode::Audio),
            "video" => Some(ChatMode::Video),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ChatMode::Text => 0,
            ChatMode::Audio => 1,
            ChatMode::Video => 2,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported gender. Absent means unknown, and an unknown gender never
/// satisfies a targeted preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Others,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Gender> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "others" => Some(Gender::Others),
            _ => None,
        }
    }
}

/// Which genders a requester is willing to be paired with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPreference {
    #[default]
    Any,
    Male,
    Female,
}

impl GenderPreference {
    pub fn parse(s: &str) -> Option<GenderPreference> {
        match s {
            "any" => Some(GenderPreference::Any),
            "male" => Some(GenderPreference::Male),
            "female" => Some(GenderPreference::Female),
            _ => None,
        }
    }

    /// Directional acceptance: `Any` accepts everyone; a targeted preference
    /// accepts only a known, equal gender.
    pub fn accepts(self, gender: Option<Gender>) -> bool {
        match self {
            GenderPreference::Any => true,
            GenderPreference::Male => gender == Some(Gender::Male),
            GenderPreference::Female => gender == Some(Gender::Female),
        }
    }
}

/// A requester's pairing preferences. `age_range` is carried for session
/// consumers but does not gate pairing.
#[derive(Debug, Clone, Default)]
pub struct MatchPreferences {
    pub gender_preference: GenderPreference,
    pub language: Option<String>,
    pub interests: Vec<String>,
    pub age_range: Option<(u8, u8)>,
}

/// A user's pending search for a peer. Lives in exactly one mode queue until
/// it is matched, cancelled, or evicted.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub user_id: String,
    pub mode: ChatMode,
    pub preferences: MatchPreferences,
    pub user_gender: Option<Gender>,
    /// Set once at creation and never mutated; age is always `now - enqueued_at`.
    pub enqueued_at: Instant,
}

impl MatchRequest {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

/// Descriptor of a successful pairing, created exactly once and handed to the
/// session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "userIdA")]
    pub user_id_a: String,
    #[serde(rename = "userIdB")]
    pub user_id_b: String,
    pub mode: ChatMode,
    #[serde(rename = "startedAt")]
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Result of a match request.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Paired immediately; the peer was removed from the queue before this
    /// outcome was produced.
    Matched { session: Session },
    /// No compatible peer right now; the request is waiting in its mode queue.
    Queued {
        /// 1-based position in the mode queue.
        position: usize,
        estimated_wait_secs: u64,
    },
}

/// Waiting counts per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub text: usize,
    pub audio: usize,
    pub video: usize,
    pub total: usize,
}

impl QueueStats {
    pub fn waiting(&self, mode: ChatMode) -> usize {
        match mode {
            ChatMode::Text => self.text,
            ChatMode::Audio => self.audio,
            ChatMode::Video => self.video,
        }
    }
}
