//! Property and scenario tests for the adherence engine.
//!
//! Covers the streak, rate and toggle laws over arbitrary completion sets
//! and the worked calendar scenarios.

use chrono::NaiveDate;
use proptest::prelude::*;
use wellnest_core::adherence::{best_streak, parse_day, toggle_completion};
use wellnest_core::{AdherenceEngine, CompletionSet};

fn days(list: &[&str]) -> CompletionSet {
    list.iter().map(|d| parse_day(d).unwrap()).collect()
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn offset(n: i64) -> NaiveDate {
    base() + chrono::Duration::days(n)
}

#[test]
fn consecutive_run_ending_today() {
    let engine = AdherenceEngine::new();
    let records = days(&["2024-01-01", "2024-01-02", "2024-01-03"]);
    let as_of = parse_day("2024-01-03").unwrap();
    assert_eq!(engine.current_streak(&records, as_of), 3);
    assert_eq!(engine.best_streak(&records, as_of), 3);
}

#[test]
fn gap_resets_run() {
    let engine = AdherenceEngine::new();
    let records = days(&["2024-01-01", "2024-01-03"]);
    let as_of = parse_day("2024-01-03").unwrap();
    assert_eq!(engine.current_streak(&records, as_of), 1);
    assert_eq!(engine.best_streak(&records, as_of), 1);
}

#[test]
fn removing_a_day_splits_the_run() {
    let engine = AdherenceEngine::new();
    let records = days(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]);
    let records = toggle_completion(&records, parse_day("2024-01-03").unwrap());
    let as_of = parse_day("2024-01-05").unwrap();
    assert_eq!(best_streak(&records), 2);
    assert_eq!(engine.best_streak(&records, as_of), 2);
    assert_eq!(engine.current_streak(&records, as_of), 2);
}

#[test]
fn three_of_seven_days_rounds_to_43() {
    let engine = AdherenceEngine::new();
    let records = days(&["2024-02-05", "2024-02-08", "2024-02-09"]);
    let rate = engine
        .completion_rate(&records, 7, parse_day("2024-02-10").unwrap())
        .unwrap();
    assert_eq!(rate, 43);
}

#[test]
fn empty_history_has_no_streak() {
    let engine = AdherenceEngine::new();
    assert_eq!(engine.current_streak(&CompletionSet::new(), base()), 0);
    assert_eq!(engine.best_streak(&CompletionSet::new(), base()), 0);
}

#[test]
fn future_days_are_accepted() {
    let engine = AdherenceEngine::new();
    let records = toggle_completion(&CompletionSet::new(), offset(30));
    assert!(records.contains(&offset(30)));
    assert_eq!(engine.current_streak(&records, base()), 0);
    assert_eq!(engine.best_streak(&records, base()), 1);
}

fn completion_sets() -> impl Strategy<Value = CompletionSet> {
    proptest::collection::btree_set(0i64..400, 0..120)
        .prop_map(|offsets| offsets.into_iter().map(offset).collect())
}

proptest! {
    #[test]
    fn double_toggle_restores_records(records in completion_sets(), target in 0i64..400) {
        let day = offset(target);
        prop_assert_eq!(toggle_completion(&toggle_completion(&records, day), day), records);
    }

    #[test]
    fn best_is_at_least_current(records in completion_sets(), today in 0i64..400) {
        let engine = AdherenceEngine::new();
        let as_of = offset(today);
        prop_assert!(engine.best_streak(&records, as_of) >= engine.current_streak(&records, as_of));
    }

    #[test]
    fn historical_best_covers_current(records in completion_sets(), today in 0i64..400) {
        let engine = AdherenceEngine::new();
        let as_of = offset(today);
        prop_assert!(best_streak(&records) >= engine.current_streak(&records, as_of));
    }

    #[test]
    fn rate_stays_in_bounds(records in completion_sets(), today in 0i64..400, window in 1u32..60) {
        let engine = AdherenceEngine::new();
        let rate = engine.completion_rate(&records, window, offset(today)).unwrap();
        prop_assert!(rate <= 100);
    }

    #[test]
    fn current_streak_respects_lookback(records in completion_sets(), today in 0i64..400, lookback in 1u32..30) {
        let engine = AdherenceEngine::with_params(lookback, 5.0).unwrap();
        prop_assert!(engine.current_streak(&records, offset(today)) <= lookback);
    }
}
