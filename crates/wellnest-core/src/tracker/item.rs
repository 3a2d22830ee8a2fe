use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::adherence::{AdherenceEngine, CompletionSet};
use crate::error::ValidationError;

/// Habit category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Health,
    Fitness,
    Mindfulness,
    Nutrition,
    Productivity,
    Learning,
    Social,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Health,
        Category::Fitness,
        Category::Mindfulness,
        Category::Nutrition,
        Category::Productivity,
        Category::Learning,
        Category::Social,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Fitness => "fitness",
            Category::Mindfulness => "mindfulness",
            Category::Nutrition => "nutrition",
            Category::Productivity => "productivity",
            Category::Learning => "learning",
            Category::Social => "social",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::invalid("category", format!("unknown category '{s}'")))
    }
}

/// One completed day for a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: NaiveDate,
    /// When the completion was marked; not used in any calculation
    pub completed_at: DateTime<Utc>,
}

/// A habit the user checks off day by day.
///
/// `current_streak` and `best_streak` cache the last computation and are
/// rewritten on every toggle or refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Category,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub records: Vec<CompletionRecord>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
}

impl TrackedItem {
    /// Create an empty item with a fresh id.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyName`] for blank names.
    pub fn new(name: &str, category: Category, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category,
            created_at: now,
            records: Vec::new(),
            current_streak: 0,
            best_streak: 0,
        })
    }

    pub fn completion_days(&self) -> CompletionSet {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn is_completed(&self, day: NaiveDate) -> bool {
        self.records.iter().any(|r| r.date == day)
    }

    /// Flip completion for `day` and recompute streaks as of `today`.
    ///
    /// Returns whether `day` is completed after the toggle.
    pub fn toggle(
        &mut self,
        day: NaiveDate,
        now: DateTime<Utc>,
        today: NaiveDate,
        engine: &AdherenceEngine,
    ) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.date != day);
        let completed = self.records.len() == before;
        if completed {
            self.records.push(CompletionRecord {
                date: day,
                completed_at: now,
            });
        }
        self.refresh(today, engine);
        completed
    }

    /// Recompute the cached streaks.
    pub fn refresh(&mut self, today: NaiveDate, engine: &AdherenceEngine) {
        let days = self.completion_days();
        self.current_streak = engine.current_streak(&days, today);
        self.best_streak = engine.best_streak(&days, today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn new_item_is_empty() {
        let item = TrackedItem::new("  Drink water ", Category::default(), now()).unwrap();
        assert_eq!(item.name, "Drink water");
        assert_eq!(item.category, Category::Health);
        assert!(item.records.is_empty());
        assert_eq!(item.current_streak, 0);
        assert_eq!(item.best_streak, 0);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(
            TrackedItem::new("   ", Category::Other, now()).unwrap_err(),
            ValidationError::EmptyName
        );
    }

    #[test]
    fn ids_are_unique() {
        let a = TrackedItem::new("a", Category::Other, now()).unwrap();
        let b = TrackedItem::new("a", Category::Other, now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn toggle_keeps_one_record_per_day() {
        let engine = AdherenceEngine::new();
        let mut item = TrackedItem::new("Stretch", Category::Fitness, now()).unwrap();

        assert!(item.toggle(day(4), now(), day(5), &engine));
        assert!(item.toggle(day(5), now(), day(5), &engine));
        assert_eq!(item.records.len(), 2);
        assert_eq!(item.current_streak, 2);
        assert_eq!(item.best_streak, 2);

        assert!(!item.toggle(day(5), now(), day(5), &engine));
        assert_eq!(item.records.len(), 1);
        assert!(!item.is_completed(day(5)));
        assert_eq!(item.current_streak, 0);
        assert_eq!(item.best_streak, 1);
    }

    #[test]
    fn records_keep_insertion_order() {
        let engine = AdherenceEngine::new();
        let mut item = TrackedItem::new("Read", Category::Learning, now()).unwrap();
        item.toggle(day(3), now(), day(5), &engine);
        item.toggle(day(1), now(), day(5), &engine);
        let dates: Vec<_> = item.records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(3), day(1)]);
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Mindfulness".parse::<Category>().unwrap(), Category::Mindfulness);
        assert!("cooking".parse::<Category>().is_err());
    }
}
