use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::models::Session;

/// Errors from the session persistence layer.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence collaborator for successful pairings.
///
/// Called exactly once per pairing, after the queue removal has committed. A
/// failure here never unwinds the match — implementations log and retry on
/// their side; the matcher only records the error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Liveness probe for health endpoints. Stores without a backend are
    /// always healthy.
    async fn health_check(&self) -> Result<bool, SessionStoreError> {
        Ok(true)
    }
}

/// PostgreSQL-backed session store.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Connect to the database with a bounded pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SessionStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        sqlx::query(
            "INSERT INTO chat_sessions (session_id, user_id_a, user_id_b, mode, started_at, status) \
             VALUES ($1, $2, $3, $4, $5, 'active')",
        )
        .bind(&session.session_id)
        .bind(&session.user_id_a)
        .bind(&session.user_id_b)
        .bind(session.mode.as_str())
        .bind(session.started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SessionStoreError> {
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every session emitted so far.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().expect("session store poisoned").clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.sessions
            .lock()
            .expect("session store poisoned")
            .push(session.clone());
        Ok(())
    }
}
