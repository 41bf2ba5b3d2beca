use serde::{Deserialize, Serialize};
use crate::models::domain::{QueueStats, Session};

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(rename = "estimatedWaitSecs", skip_serializing_if = "Option::is_none")]
    pub estimated_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Matched,
    Queued,
}

/// Response for the cancel endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    /// Whether a pending request was actually removed. Cancelling an unknown
    /// or already-matched request succeeds without removing anything.
    pub removed: bool,
}

/// Response for the queue stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatsResponse {
    #[serde(flatten)]
    pub stats: QueueStats,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Response for the queue position endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePositionResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub mode: String,
    pub position: Option<usize>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
