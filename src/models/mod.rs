// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{ChatMode, Gender, GenderPreference, MatchOutcome, MatchPreferences, MatchRequest, QueueStats, Session};
pub use requests::{CancelMatchBody, PreferencesBody, RequestMatchBody};
pub use responses::{CancelResponse, ErrorResponse, HealthResponse, MatchResponse, MatchStatus, QueuePositionResponse, QueueStatsResponse};
