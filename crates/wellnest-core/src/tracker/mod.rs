//! Habit, sleep, meditation and health-metric trackers.
//!
//! Habits are [`TrackedItem`]s toggled day by day; the other trackers append
//! tagged [`Record`]s to a shared journal. [`WellnessState`] owns both.

mod item;
mod record;
mod state;

pub use item::{Category, CompletionRecord, TrackedItem};
pub use record::{daily_series, days_of, DailyValue, MetricKind, Polarity, Record};
pub use state::{
    ItemSummary, MeditationSummary, MetricSummary, SleepSummary, SummaryOptions, WellnessState,
};
