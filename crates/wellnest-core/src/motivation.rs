//! Points, levels, streak celebrations and the quote of the day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::tracker::{Record, WellnessState};

pub const POINTS_PER_COMPLETION: u64 = 10;
pub const POINTS_PER_SLEEP_LOG: u64 = 5;
pub const POINTS_PER_MEDITATION_MINUTE: u64 = 1;
pub const POINTS_PER_METRIC_ENTRY: u64 = 2;
pub const POINTS_PER_BEST_STREAK_DAY: u64 = 5;

/// Streak lengths that earn a celebration on the day they are reached.
pub const STREAK_MILESTONES: [u32; 9] = [3, 7, 14, 21, 30, 50, 100, 180, 365];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub habit_completions: u64,
    pub sleep_logs: u64,
    pub meditation_minutes: u64,
    pub metric_entries: u64,
    pub streak_bonus: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub points: u64,
    pub current_level_floor: u64,
    pub next_level_at: u64,
    pub progress_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Celebration {
    pub item_id: String,
    pub item_name: String,
    pub streak_days: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotivationReport {
    pub points: PointsBreakdown,
    pub level: LevelProgress,
    pub celebrations: Vec<Celebration>,
    pub quote: Quote,
}

const QUOTES: [Quote; 10] = [
    Quote { text: "We are what we repeatedly do. Excellence, then, is not an act, but a habit.", author: "Will Durant" },
    Quote { text: "It does not matter how slowly you go as long as you do not stop.", author: "Confucius" },
    Quote { text: "Small deeds done are better than great deeds planned.", author: "Peter Marshall" },
    Quote { text: "The secret of getting ahead is getting started.", author: "Mark Twain" },
    Quote { text: "Motivation is what gets you started. Habit is what keeps you going.", author: "Jim Ryun" },
    Quote { text: "Take care of your body. It's the only place you have to live.", author: "Jim Rohn" },
    Quote { text: "A journey of a thousand miles begins with a single step.", author: "Lao Tzu" },
    Quote { text: "Sleep is the golden chain that ties health and our bodies together.", author: "Thomas Dekker" },
    Quote { text: "Quiet the mind, and the soul will speak.", author: "Ma Jaya Sati Bhagavati" },
    Quote { text: "Success is the sum of small efforts, repeated day in and day out.", author: "Robert Collier" },
];

/// Score everything in the state.
pub fn points(state: &WellnessState) -> PointsBreakdown {
    let mut breakdown = PointsBreakdown::default();
    for record in state.records() {
        match record {
            Record::Habit { .. } => breakdown.habit_completions += POINTS_PER_COMPLETION,
            Record::Sleep { .. } => breakdown.sleep_logs += POINTS_PER_SLEEP_LOG,
            Record::Meditation { minutes, .. } => {
                breakdown.meditation_minutes += u64::from(minutes) * POINTS_PER_MEDITATION_MINUTE
            }
            Record::Metric { .. } => breakdown.metric_entries += POINTS_PER_METRIC_ENTRY,
        }
    }
    breakdown.streak_bonus = state
        .items
        .iter()
        .map(|i| u64::from(i.best_streak) * POINTS_PER_BEST_STREAK_DAY)
        .sum();
    breakdown.total = breakdown.habit_completions
        + breakdown.sleep_logs
        + breakdown.meditation_minutes
        + breakdown.metric_entries
        + breakdown.streak_bonus;
    breakdown
}

/// Cumulative points needed to reach `level` (level 1 starts at 0).
pub fn level_threshold(level: u32) -> u64 {
    let n = u64::from(level.max(1));
    50 * n * (n - 1)
}

pub fn level_progress(points: u64) -> LevelProgress {
    let mut level = 1;
    while level_threshold(level + 1) <= points {
        level += 1;
    }
    let floor = level_threshold(level);
    let next = level_threshold(level + 1);
    let progress = ((points - floor) as f64 / (next - floor) as f64 * 100.0).floor();
    LevelProgress {
        level,
        points,
        current_level_floor: floor,
        next_level_at: next,
        progress_percent: progress.clamp(0.0, 100.0) as u8,
    }
}

/// Items whose live streak sits exactly on a milestone.
pub fn celebrations(state: &WellnessState) -> Vec<Celebration> {
    state
        .items
        .iter()
        .filter(|i| STREAK_MILESTONES.contains(&i.current_streak))
        .map(|i| Celebration {
            item_id: i.id.clone(),
            item_name: i.name.clone(),
            streak_days: i.current_streak,
            message: format!("{} days of {} in a row!", i.current_streak, i.name),
        })
        .collect()
}

/// Same quote for the whole day, cycling through the list over the year.
pub fn quote_of_the_day(day: NaiveDate) -> Quote {
    QUOTES[day.ordinal0() as usize % QUOTES.len()]
}

/// Assemble the full report. Streaks must already be refreshed.
pub fn report(state: &WellnessState, today: NaiveDate) -> MotivationReport {
    let points = points(state);
    MotivationReport {
        points,
        level: level_progress(points.total),
        celebrations: celebrations(state),
        quote: quote_of_the_day(today),
    }
}
