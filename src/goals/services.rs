use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::progress::{summarize, GoalSummary};
use super::repo;

pub async fn summary_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<GoalSummary> {
    let goals = repo::list_all_by_user(db, user_id).await?;
    summarize(&goals).with_context(|| format!("summarize goals of user {user_id}"))
}
