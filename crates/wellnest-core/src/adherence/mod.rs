//! Adherence engine: streaks, completion rates and trends.
//!
//! Every tracker in Wellnest reduces its entries to a set of calendar days
//! (for streaks and rates) or a date-ordered numeric series (for trends).
//! The functions here are pure; the caller supplies `as_of` explicitly and
//! nothing reads the system clock.

mod streak;
mod trend;

pub use streak::{best_streak, toggle_completion, CompletionSet};
pub use trend::{Trend, TrendDirection};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How far back `current_streak` walks before giving up.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// Minimum relative change, in percent, before a trend counts as a move.
pub const DEFAULT_TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Parse a strict `YYYY-MM-DD` calendar day.
pub fn parse_day(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    // chrono accepts unpadded fields; the canonical key is always 10 chars
    if trimmed.len() != 10 {
        return Err(ValidationError::MalformedDate {
            input: input.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| ValidationError::MalformedDate {
        input: input.to_string(),
    })
}

/// Format a day the way it is keyed everywhere else.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Streak and rate figures for one set of completion days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceSummary {
    pub current_streak: u32,
    pub best_streak: u32,
    /// Percentage of days in the window with a completion (0-100)
    pub completion_rate: u8,
    pub window_days: u32,
    pub total_completions: u32,
}

/// Stateless calculator parameterized by look-back and trend threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdherenceEngine {
    lookback_days: u32,
    trend_threshold_percent: f64,
}

impl Default for AdherenceEngine {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            trend_threshold_percent: DEFAULT_TREND_THRESHOLD_PERCENT,
        }
    }
}

impl AdherenceEngine {
    /// Create an engine with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom parameters.
    ///
    /// # Errors
    /// Rejects a zero look-back or a negative/non-finite threshold.
    pub fn with_params(
        lookback_days: u32,
        trend_threshold_percent: f64,
    ) -> Result<Self, ValidationError> {
        if lookback_days == 0 {
            return Err(ValidationError::invalid(
                "lookback_days",
                "must be at least 1",
            ));
        }
        if !trend_threshold_percent.is_finite() || trend_threshold_percent < 0.0 {
            return Err(ValidationError::invalid(
                "trend_threshold_percent",
                "must be a finite, non-negative number",
            ));
        }
        Ok(Self {
            lookback_days,
            trend_threshold_percent,
        })
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn trend_threshold_percent(&self) -> f64 {
        self.trend_threshold_percent
    }

    /// Add `day` if absent, remove it if present.
    pub fn toggle_completion(&self, days: &CompletionSet, day: NaiveDate) -> CompletionSet {
        toggle_completion(days, day)
    }

    /// Consecutive completed days ending at `as_of` (inclusive).
    ///
    /// Returns 0 when `as_of` itself has no completion. The walk stops after
    /// `lookback_days` days, so the result never exceeds that bound.
    pub fn current_streak(&self, days: &CompletionSet, as_of: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut day = as_of;
        while streak < self.lookback_days && days.contains(&day) {
            streak += 1;
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        streak
    }

    /// Longest run anywhere in the history, never below the live streak.
    pub fn best_streak(&self, days: &CompletionSet, as_of: NaiveDate) -> u32 {
        best_streak(days).max(self.current_streak(days, as_of))
    }

    /// Percentage of the `window_days` days ending at `as_of` that have a
    /// completion, rounded to the nearest integer.
    ///
    /// # Errors
    /// A zero window is rejected rather than clamped.
    pub fn completion_rate(
        &self,
        days: &CompletionSet,
        window_days: u32,
        as_of: NaiveDate,
    ) -> Result<u8, ValidationError> {
        if window_days == 0 {
            return Err(ValidationError::invalid("window_days", "must be at least 1"));
        }
        let start = as_of
            .checked_sub_signed(chrono::Duration::days(i64::from(window_days) - 1))
            .unwrap_or(NaiveDate::MIN);
        let hits = days.range(start..=as_of).count();
        let pct = (hits as f64 / f64::from(window_days) * 100.0).round();
        Ok(pct.clamp(0.0, 100.0) as u8)
    }

    /// Compare the average of the last `recent_window` points against the
    /// `prior_window` points immediately before them.
    pub fn trend(&self, series: &[f64], recent_window: usize, prior_window: usize) -> Trend {
        trend::compute(series, recent_window, prior_window, self.trend_threshold_percent)
    }

    /// Bundle the streak and rate figures for one completion set.
    ///
    /// # Errors
    /// Propagates the zero-window rejection from [`Self::completion_rate`].
    pub fn summarize(
        &self,
        days: &CompletionSet,
        as_of: NaiveDate,
        window_days: u32,
    ) -> Result<AdherenceSummary, ValidationError> {
        Ok(AdherenceSummary {
            current_streak: self.current_streak(days, as_of),
            best_streak: self.best_streak(days, as_of),
            completion_rate: self.completion_rate(days, window_days, as_of)?,
            window_days,
            total_completions: days.len() as u32,
        })
    }
}
