// Core matching engine exports
pub mod clock;
pub mod compatibility;
pub mod engine;
pub mod janitor;
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compatibility::{compatibility_score, gender_compatible};
pub use engine::{MatchError, MatchingConfig, MatchingEngine};
pub use janitor::spawn_janitor;
pub use queue::{DuplicateUserError, WaitQueue};
