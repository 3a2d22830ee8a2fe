use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Completed calendar days, ordered and de-duplicated.
pub type CompletionSet = BTreeSet<NaiveDate>;

/// Return a copy of `days` with `day` flipped.
///
/// Toggling the same day twice yields the original set, and toggles on
/// different days commute. Future days are accepted.
pub fn toggle_completion(days: &CompletionSet, day: NaiveDate) -> CompletionSet {
    let mut next = days.clone();
    if !next.remove(&day) {
        next.insert(day);
    }
    next
}

/// Length of the longest run of calendar-consecutive days.
pub fn best_streak(days: &CompletionSet) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &day in days {
        run = match prev.and_then(|p| p.succ_opt()) {
            Some(expected) if expected == day => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}
