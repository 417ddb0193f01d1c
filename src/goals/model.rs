use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::{GoalCreate, GoalUpdate};
use super::progress::{compute_progress, ProgressError};

/// Goal grouping. Declaration order is the canonical order used in summaries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "goal_category", rename_all = "snake_case")]
pub enum GoalCategory {
    #[default]
    Financial,
    Career,
    PersonalHealth,
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 3] = [
        GoalCategory::Financial,
        GoalCategory::Career,
        GoalCategory::PersonalHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Financial => "financial",
            GoalCategory::Career => "career",
            GoalCategory::PersonalHealth => "personal_health",
        }
    }
}

impl fmt::Display for GoalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation color of a goal.
///
/// Parsing never fails: anything outside the palette becomes [`GoalColor::Blue`],
/// both when reading JSON and when reading stored rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalColor {
    Emerald,
    #[default]
    Blue,
    Amber,
    Violet,
    Rose,
    Indigo,
    Pink,
    Teal,
}

impl GoalColor {
    pub const ALL: [GoalColor; 8] = [
        GoalColor::Emerald,
        GoalColor::Blue,
        GoalColor::Amber,
        GoalColor::Violet,
        GoalColor::Rose,
        GoalColor::Indigo,
        GoalColor::Pink,
        GoalColor::Teal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalColor::Emerald => "emerald",
            GoalColor::Blue => "blue",
            GoalColor::Amber => "amber",
            GoalColor::Violet => "violet",
            GoalColor::Rose => "rose",
            GoalColor::Indigo => "indigo",
            GoalColor::Pink => "pink",
            GoalColor::Teal => "teal",
        }
    }
}

impl From<&str> for GoalColor {
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        GoalColor::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for GoalColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(GoalColor::from(raw.as_str()))
    }
}

impl fmt::Display for GoalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_ICON: &str = "🎯";

/// `YYYY-MM-DD` (de)serialization for optional calendar dates.
pub(crate) mod calendar_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => {
                let text = d.format(FORMAT).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Date::parse(raw.trim(), FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// A user's savings/progress target, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target: f64,
    pub saved: f64,
    pub icon: String,
    pub color: GoalColor,
    pub category: GoalCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "calendar_date")]
    pub deadline: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Goal {
    pub fn progress(&self) -> Result<i64, ProgressError> {
        compute_progress(self.saved, self.target)
    }

    /// Saved amount as accepted by the "update saved amount" operation.
    pub fn clamp_saved_amount(&self, amount: f64) -> f64 {
        amount.min(self.target).max(0.0)
    }

    /// Local stand-in for a goal the server has not confirmed yet.
    pub fn provisional(data: &GoalCreate, user_id: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: data.title.trim().to_string(),
            target: data.target,
            saved: data.saved,
            icon: data.icon.clone(),
            color: data.color,
            category: data.category,
            description: data.description.clone().filter(|d| !d.is_empty()),
            deadline: data.deadline,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this goal with the fields present in `update` replaced.
    pub fn merged(&self, update: &GoalUpdate) -> Self {
        let mut goal = self.clone();
        update.apply_to(&mut goal);
        goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::fixtures::goal;

    #[test]
    fn unknown_color_falls_back_to_blue() {
        assert_eq!(GoalColor::from("violet"), GoalColor::Violet);
        assert_eq!(GoalColor::from("  Teal "), GoalColor::Teal);
        assert_eq!(GoalColor::from("chartreuse"), GoalColor::Blue);
        assert_eq!(GoalColor::from(""), GoalColor::Blue);

        let parsed: GoalColor = serde_json::from_str("\"neon\"").unwrap();
        assert_eq!(parsed, GoalColor::Blue);
        assert_eq!(serde_json::to_string(&GoalColor::Rose).unwrap(), "\"rose\"");
    }

    #[test]
    fn category_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&GoalCategory::PersonalHealth).unwrap();
        assert_eq!(json, "\"personal_health\"");
        let parsed: GoalCategory = serde_json::from_str("\"career\"").unwrap();
        assert_eq!(parsed, GoalCategory::Career);
        assert!(serde_json::from_str::<GoalCategory>("\"hobby\"").is_err());
    }

    #[test]
    fn categories_order_by_declaration() {
        let mut cats = vec![
            GoalCategory::PersonalHealth,
            GoalCategory::Financial,
            GoalCategory::Career,
        ];
        cats.sort();
        assert_eq!(cats, GoalCategory::ALL.to_vec());
    }

    #[test]
    fn goal_json_uses_plain_dates() {
        let mut g = goal(GoalCategory::Financial, 1000.0, 250.0);
        g.deadline = Some(Date::from_calendar_date(2025, time::Month::March, 9).unwrap());

        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["deadline"], "2025-03-09");
        assert_eq!(json["category"], "financial");
        assert!(json["created_at"].as_str().unwrap().contains('T'));

        let back: Goal = serde_json::from_value(json).unwrap();
        assert_eq!(back.deadline, g.deadline);
    }

    #[test]
    fn missing_or_empty_deadline_is_none() {
        let mut json = serde_json::to_value(goal(GoalCategory::Career, 10.0, 0.0)).unwrap();
        json["deadline"] = serde_json::Value::String(String::new());
        let parsed: Goal = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed.deadline, None);

        json.as_object_mut().unwrap().remove("deadline");
        let parsed: Goal = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.deadline, None);
    }

    #[test]
    fn saved_amount_is_clamped_to_target() {
        let g = goal(GoalCategory::Financial, 1000.0, 1000.0);
        assert_eq!(g.clamp_saved_amount(1500.0), 1000.0);
        assert_eq!(g.clamp_saved_amount(-5.0), 0.0);
        assert_eq!(g.clamp_saved_amount(420.5), 420.5);
    }
}
