use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::model::{Goal, GoalCategory, GoalColor};

/// Goal row as stored; color is free text in the table.
#[derive(Debug, FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target: f64,
    pub saved: f64,
    pub icon: String,
    pub color: String,
    pub category: GoalCategory,
    pub description: Option<String>,
    pub deadline: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<GoalRow> for Goal {
    fn from(r: GoalRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            target: r.target,
            saved: r.saved,
            icon: r.icon,
            color: GoalColor::from(r.color.as_str()),
            category: r.category,
            description: r.description,
            deadline: r.deadline,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
