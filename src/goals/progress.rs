//! Progress figures for goals: per goal, per category, and overall.
//!
//! Everything here is a pure function of its input. Summaries are recomputed on
//! demand and never stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{Goal, GoalCategory};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgressError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: GoalCategory,
    pub total_saved: f64,
    pub total_target: f64,
    pub progress: i64,
    pub count: usize,
    pub achieved: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub total_saved: f64,
    pub total_target: f64,
    pub overall_progress: i64,
    pub goals_achieved: usize,
    pub total_goals: usize,
    pub by_category: Vec<CategorySummary>,
}

/// Rounded percentage of `saved / target`, clamped to `[0, 100]`.
///
/// `target` must be a finite positive number.
pub fn compute_progress(saved: f64, target: f64) -> Result<i64, ProgressError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(ProgressError::InvalidInput(format!(
            "target must be greater than 0, got {target}"
        )));
    }
    if !saved.is_finite() {
        return Err(ProgressError::InvalidInput(format!(
            "saved must be a finite amount, got {saved}"
        )));
    }
    let percent = (saved / target * 100.0).round();
    Ok(percent.clamp(0.0, 100.0) as i64)
}

#[derive(Debug, Default)]
struct Tally {
    saved: f64,
    target: f64,
    count: usize,
    achieved: usize,
}

impl Tally {
    fn add(&mut self, goal: &Goal, achieved: bool) {
        self.saved += goal.saved;
        self.target += goal.target;
        self.count += 1;
        if achieved {
            self.achieved += 1;
        }
    }

    // an empty tally has no target to divide by
    fn progress(&self) -> Result<i64, ProgressError> {
        if self.target == 0.0 {
            return Ok(0);
        }
        compute_progress(self.saved, self.target)
    }
}

/// Aggregates goals into an overall summary plus one entry per category that
/// has at least one goal, in [`GoalCategory`] declaration order.
///
/// A goal counts as achieved when its own progress reaches 100.
pub fn summarize(goals: &[Goal]) -> Result<GoalSummary, ProgressError> {
    let mut overall = Tally::default();
    let mut by_category: BTreeMap<GoalCategory, Tally> = BTreeMap::new();

    for goal in goals {
        let achieved = goal.progress()? >= 100;
        overall.add(goal, achieved);
        by_category.entry(goal.category).or_default().add(goal, achieved);
    }

    let by_category = by_category
        .into_iter()
        .map(|(category, tally)| {
            Ok(CategorySummary {
                category,
                total_saved: tally.saved,
                total_target: tally.target,
                progress: tally.progress()?,
                count: tally.count,
                achieved: tally.achieved,
            })
        })
        .collect::<Result<Vec<_>, ProgressError>>()?;

    Ok(GoalSummary {
        total_saved: overall.saved,
        total_target: overall.target,
        overall_progress: overall.progress()?,
        goals_achieved: overall.achieved,
        total_goals: overall.count,
        by_category,
    })
}
