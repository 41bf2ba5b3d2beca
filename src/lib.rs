//! Murmur Match - anonymous-chat matchmaking engine for the Murmur chat service
//!
//! This library provides the matchmaking core used by the Murmur anonymous
//! chat service. It pairs waiting users into chat sessions under mutual
//! gender-preference constraints, with time-bounded queue membership and
//! automatic expiry.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{compatibility_score, gender_compatible, spawn_janitor, MatchError, MatchingConfig, MatchingEngine};
pub use models::{ChatMode, Gender, GenderPreference, MatchOutcome, MatchPreferences, MatchRequest, QueueStats, Session};
pub use services::{MemorySessionStore, PostgresSessionStore, SessionStore};
