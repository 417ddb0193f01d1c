pub mod dto;
pub mod handlers;
pub mod model;
pub mod progress;
mod repo;
mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use model::{Goal, GoalCategory, GoalColor};
pub use progress::{compute_progress, summarize, CategorySummary, GoalSummary, ProgressError};

pub fn router() -> Router<AppState> {
    handlers::goal_routes()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::model::{Goal, GoalCategory, GoalColor, DEFAULT_ICON};

    pub fn goal(category: GoalCategory, target: f64, saved: f64) -> Goal {
        let now = OffsetDateTime::now_utc();
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: "Emergency fund".into(),
            target,
            saved,
            icon: DEFAULT_ICON.into(),
            color: GoalColor::Blue,
            category,
            description: None,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }
}
