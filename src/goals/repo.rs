use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{GoalCreate, GoalUpdate};
use super::model::{Goal, GoalCategory};
use super::repo_types::GoalRow;

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    category: Option<GoalCategory>,
    skip: i64,
    limit: i64,
) -> anyhow::Result<Vec<Goal>> {
    let rows = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT id, user_id, title, target, saved, icon, color, category,
               description, deadline, created_at, updated_at
          FROM goals
         WHERE user_id = $1
           AND ($2::goal_category IS NULL OR category = $2)
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(category)
    .bind(limit)
    .bind(skip)
    .fetch_all(db)
    .await
    .context("list goals")?;
    Ok(rows.into_iter().map(Goal::from).collect())
}

/// Every goal of the user, for summaries.
pub async fn list_all_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Goal>> {
    let rows = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT id, user_id, title, target, saved, icon, color, category,
               description, deadline, created_at, updated_at
          FROM goals
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list all goals")?;
    Ok(rows.into_iter().map(Goal::from).collect())
}

pub async fn get_by_id(db: &PgPool, user_id: Uuid, goal_id: Uuid) -> anyhow::Result<Option<Goal>> {
    let row = sqlx::query_as::<_, GoalRow>(
        r#"
        SELECT id, user_id, title, target, saved, icon, color, category,
               description, deadline, created_at, updated_at
          FROM goals
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get goal")?;
    Ok(row.map(Goal::from))
}

pub async fn insert(db: &PgPool, user_id: Uuid, data: &GoalCreate) -> anyhow::Result<Goal> {
    let row = sqlx::query_as::<_, GoalRow>(
        r#"
        INSERT INTO goals (user_id, title, target, saved, icon, color, category, description, deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, user_id, title, target, saved, icon, color, category,
                  description, deadline, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(data.title.trim())
    .bind(data.target)
    .bind(data.saved)
    .bind(&data.icon)
    .bind(data.color.as_str())
    .bind(data.category)
    .bind(data.description.as_deref().filter(|d| !d.is_empty()))
    .bind(data.deadline)
    .fetch_one(db)
    .await
    .context("insert goal")?;
    Ok(row.into())
}

/// Applies the fields present in `data`. `None` when the goal does not exist
/// or belongs to someone else.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
    data: &GoalUpdate,
) -> anyhow::Result<Option<Goal>> {
    let row = sqlx::query_as::<_, GoalRow>(
        r#"
        UPDATE goals
           SET title       = COALESCE($3, title),
               target      = COALESCE($4, target),
               saved       = COALESCE($5, saved),
               icon        = COALESCE($6, icon),
               color       = COALESCE($7, color),
               category    = COALESCE($8, category),
               description = CASE
                                 WHEN $9::text IS NULL THEN description
                                 WHEN $9::text = '' THEN NULL
                                 ELSE $9::text
                             END,
               deadline    = COALESCE($10, deadline),
               updated_at  = now()
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, target, saved, icon, color, category,
                  description, deadline, created_at, updated_at
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .bind(data.title.as_deref().map(str::trim))
    .bind(data.target)
    .bind(data.saved)
    .bind(data.icon.as_deref())
    .bind(data.color.map(|c| c.as_str()))
    .bind(data.category)
    .bind(data.description.as_deref())
    .bind(data.deadline)
    .fetch_optional(db)
    .await
    .context("update goal")?;
    Ok(row.map(Goal::from))
}

/// Stores `amount` clamped to `[0, target]`.
pub async fn update_saved(
    db: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
    amount: f64,
) -> anyhow::Result<Option<Goal>> {
    let row = sqlx::query_as::<_, GoalRow>(
        r#"
        UPDATE goals
           SET saved      = GREATEST(LEAST($3, target), 0),
               updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, target, saved, icon, color, category,
                  description, deadline, created_at, updated_at
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .bind(amount)
    .fetch_optional(db)
    .await
    .context("update saved amount")?;
    Ok(row.map(Goal::from))
}

/// `false` when nothing was deleted.
pub async fn delete(db: &PgPool, user_id: Uuid, goal_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM goals WHERE id = $1 AND user_id = $2"#)
        .bind(goal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete goal")?;
    Ok(result.rows_affected() > 0)
}
