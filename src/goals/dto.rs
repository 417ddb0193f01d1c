use serde::{Deserialize, Serialize};
use time::Date;

use super::model::{calendar_date, Goal, GoalCategory, GoalColor, DEFAULT_ICON};

const MAX_TITLE_CHARS: usize = 255;
const MAX_ICON_CHARS: usize = 10;
/// Largest accepted amount: 13 integer digits and 2 decimals.
pub const MAX_AMOUNT: f64 = 9_999_999_999_999.99;

/// Body of `POST /goals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCreate {
    pub title: String,
    pub target: f64,
    #[serde(default)]
    pub saved: f64,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub color: GoalColor,
    #[serde(default)]
    pub category: GoalCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "calendar_date")]
    pub deadline: Option<Date>,
}

fn default_icon() -> String {
    DEFAULT_ICON.into()
}

impl GoalCreate {
    pub fn new(title: impl Into<String>, target: f64) -> Self {
        Self {
            title: title.into(),
            target,
            saved: 0.0,
            icon: default_icon(),
            color: GoalColor::default(),
            category: GoalCategory::default(),
            description: None,
            deadline: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        validate_target(self.target)?;
        validate_saved(self.saved)?;
        validate_icon(&self.icon)
    }
}

/// Body of `PATCH /goals/:id`. Absent fields stay as they are; an empty
/// description clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<GoalColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<GoalCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Date>,
}

impl GoalUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(target) = self.target {
            validate_target(target)?;
        }
        if let Some(saved) = self.saved {
            validate_saved(saved)?;
        }
        if let Some(icon) = &self.icon {
            validate_icon(icon)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &GoalUpdate::default()
    }

    pub fn apply_to(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title = title.trim().to_string();
        }
        if let Some(target) = self.target {
            goal.target = target;
        }
        if let Some(saved) = self.saved {
            goal.saved = saved;
        }
        if let Some(icon) = &self.icon {
            goal.icon = icon.clone();
        }
        if let Some(color) = self.color {
            goal.color = color;
        }
        if let Some(category) = self.category {
            goal.category = category;
        }
        if let Some(description) = &self.description {
            goal.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(deadline) = self.deadline {
            goal.deadline = Some(deadline);
        }
    }
}

/// Body of `PATCH /goals/:id/saved`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedAmountUpdate {
    pub amount: f64,
}

impl SavedAmountUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err("amount must be a non-negative number".into());
        }
        if self.amount > MAX_AMOUNT {
            return Err(format!("amount must not exceed {MAX_AMOUNT:.2}"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<GoalCategory>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl ListQuery {
    pub fn validate(&self) -> Result<(), String> {
        if self.skip < 0 {
            return Err("skip must be >= 0".into());
        }
        if !(1..=200).contains(&self.limit) {
            return Err("limit must be between 1 and 200".into());
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err("title must not be empty".into());
    }
    if len > MAX_TITLE_CHARS {
        return Err(format!("title must be at most {MAX_TITLE_CHARS} characters"));
    }
    Ok(())
}

fn validate_target(target: f64) -> Result<(), String> {
    if !target.is_finite() || target <= 0.0 {
        return Err("target must be greater than 0".into());
    }
    if target > MAX_AMOUNT {
        return Err(format!("target must not exceed {MAX_AMOUNT:.2}"));
    }
    Ok(())
}

fn validate_saved(saved: f64) -> Result<(), String> {
    if !saved.is_finite() || saved < 0.0 {
        return Err("saved must be a non-negative number".into());
    }
    if saved > MAX_AMOUNT {
        return Err(format!("saved must not exceed {MAX_AMOUNT:.2}"));
    }
    Ok(())
}

fn validate_icon(icon: &str) -> Result<(), String> {
    if icon.chars().count() > MAX_ICON_CHARS {
        return Err(format!("icon must be at most {MAX_ICON_CHARS} characters"));
    }
    Ok(())
}
