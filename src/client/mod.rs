//! Optimistic client-side cache over the goals API.

pub mod api;
pub mod cache;
pub mod error;
pub mod session;
pub mod sync;

pub use api::{ClientConfig, GoalsApi, HttpGoalsApi};
pub use cache::{CacheKey, GoalCache, Snapshot};
pub use error::SyncError;
pub use session::Session;
pub use sync::GoalSync;
