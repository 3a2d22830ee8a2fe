//! Journal entries for each tracker kind.
//!
//! Every variant carries only the fields its tracker needs and projects to
//! a [`DailyValue`] so the adherence engine can treat them uniformly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::adherence::CompletionSet;
use crate::error::ValidationError;

/// Longest loggable meditation session: one full day.
pub const MAX_SESSION_MINUTES: u32 = 24 * 60;

/// Health metrics that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Weight,
    RestingHeartRate,
    Steps,
    Water,
    Mood,
    Energy,
}

/// Whether a larger value is an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Weight,
        MetricKind::RestingHeartRate,
        MetricKind::Steps,
        MetricKind::Water,
        MetricKind::Mood,
        MetricKind::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Weight => "weight",
            MetricKind::RestingHeartRate => "resting_heart_rate",
            MetricKind::Steps => "steps",
            MetricKind::Water => "water",
            MetricKind::Mood => "mood",
            MetricKind::Energy => "energy",
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            MetricKind::Weight | MetricKind::RestingHeartRate => Polarity::LowerIsBetter,
            _ => Polarity::HigherIsBetter,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        MetricKind::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ValidationError::invalid("metric", format!("unknown metric '{s}'")))
    }
}

/// The common `{date, value}` projection of a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// A dated entry from one of the trackers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Habit {
        item_id: String,
        date: NaiveDate,
        completed_at: DateTime<Utc>,
    },
    Sleep {
        date: NaiveDate,
        hours: f64,
        /// Subjective quality, 1 (poor) to 5 (great)
        quality: u8,
        logged_at: DateTime<Utc>,
    },
    Meditation {
        date: NaiveDate,
        minutes: u32,
        logged_at: DateTime<Utc>,
    },
    Metric {
        date: NaiveDate,
        metric: MetricKind,
        value: f64,
        logged_at: DateTime<Utc>,
    },
}

impl Record {
    pub fn date(&self) -> NaiveDate {
        match self {
            Record::Habit { date, .. }
            | Record::Sleep { date, .. }
            | Record::Meditation { date, .. }
            | Record::Metric { date, .. } => *date,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::Habit { .. } => "habit",
            Record::Sleep { .. } => "sleep",
            Record::Meditation { .. } => "meditation",
            Record::Metric { .. } => "metric",
        }
    }

    pub fn projection(&self) -> DailyValue {
        let value = match self {
            Record::Habit { .. } => 1.0,
            Record::Sleep { hours, .. } => *hours,
            Record::Meditation { minutes, .. } => f64::from(*minutes),
            Record::Metric { value, .. } => *value,
        };
        DailyValue {
            date: self.date(),
            value,
        }
    }

    /// Check the per-kind field ranges.
    ///
    /// # Errors
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Record::Habit { .. } => Ok(()),
            Record::Sleep { hours, quality, .. } => {
                if !hours.is_finite() || *hours <= 0.0 || *hours > 24.0 {
                    return Err(ValidationError::invalid("hours", "must be within (0, 24]"));
                }
                if !(1..=5).contains(quality) {
                    return Err(ValidationError::invalid("quality", "must be between 1 and 5"));
                }
                Ok(())
            }
            Record::Meditation { minutes, .. } => {
                if *minutes == 0 || *minutes > MAX_SESSION_MINUTES {
                    return Err(ValidationError::invalid(
                        "minutes",
                        format!("must be within 1..={MAX_SESSION_MINUTES}"),
                    ));
                }
                Ok(())
            }
            Record::Metric { value, .. } => {
                if !value.is_finite() || *value < 0.0 {
                    return Err(ValidationError::invalid(
                        "value",
                        "must be a finite, non-negative number",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Distinct days present in `records`.
pub fn days_of<'a, I>(records: I) -> CompletionSet
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().map(Record::date).collect()
}

/// Collapse projections to one point per day, ascending by date.
///
/// Sleep and meditation add up within a day; metrics are averaged.
pub fn daily_series<'a, I>(records: I) -> Vec<DailyValue>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_day: BTreeMap<NaiveDate, (f64, u32, bool)> = BTreeMap::new();
    for record in records {
        let point = record.projection();
        let averaged = matches!(record, Record::Metric { .. });
        let entry = by_day.entry(point.date).or_insert((0.0, 0, averaged));
        entry.0 += point.value;
        entry.1 += 1;
    }
    by_day
        .into_iter()
        .map(|(date, (sum, count, averaged))| DailyValue {
            date,
            value: if averaged { sum / f64::from(count) } else { sum },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 7, 30, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn projection_per_kind() {
        let sleep = Record::Sleep { date: day(1), hours: 7.5, quality: 4, logged_at: at() };
        let med = Record::Meditation { date: day(1), minutes: 12, logged_at: at() };
        let habit = Record::Habit { item_id: "x".into(), date: day(1), completed_at: at() };
        assert_eq!(sleep.projection().value, 7.5);
        assert_eq!(med.projection().value, 12.0);
        assert_eq!(habit.projection().value, 1.0);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let rec = Record::Metric {
            date: day(2),
            metric: MetricKind::RestingHeartRate,
            value: 58.0,
            logged_at: at(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "metric");
        assert_eq!(json["metric"], "resting_heart_rate");
        assert_eq!(json["date"], "2024-03-02");
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn validation_bounds() {
        let bad_hours = Record::Sleep { date: day(1), hours: 25.0, quality: 3, logged_at: at() };
        let bad_quality = Record::Sleep { date: day(1), hours: 8.0, quality: 0, logged_at: at() };
        let zero_minutes = Record::Meditation { date: day(1), minutes: 0, logged_at: at() };
        let negative = Record::Metric { date: day(1), metric: MetricKind::Steps, value: -1.0, logged_at: at() };
        assert!(bad_hours.validate().is_err());
        assert!(bad_quality.validate().is_err());
        assert!(zero_minutes.validate().is_err());
        assert!(negative.validate().is_err());
    }

    #[test]
    fn meditation_is_capped_at_one_day() {
        let full_day = Record::Meditation { date: day(1), minutes: MAX_SESSION_MINUTES, logged_at: at() };
        let too_long = Record::Meditation { date: day(1), minutes: 3_000_000_000, logged_at: at() };
        assert!(full_day.validate().is_ok());
        assert!(matches!(
            too_long.validate(),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "minutes"
        ));
    }

    #[test]
    fn daily_series_sums_sessions_and_averages_metrics() {
        let records = vec![
            Record::Meditation { date: day(2), minutes: 10, logged_at: at() },
            Record::Meditation { date: day(1), minutes: 5, logged_at: at() },
            Record::Meditation { date: day(2), minutes: 15, logged_at: at() },
        ];
        let series = daily_series(&records);
        assert_eq!(series, vec![
            DailyValue { date: day(1), value: 5.0 },
            DailyValue { date: day(2), value: 25.0 },
        ]);

        let weights = vec![
            Record::Metric { date: day(1), metric: MetricKind::Weight, value: 70.0, logged_at: at() },
            Record::Metric { date: day(1), metric: MetricKind::Weight, value: 71.0, logged_at: at() },
        ];
        assert_eq!(daily_series(&weights)[0].value, 70.5);
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("resting-heart-rate".parse::<MetricKind>().unwrap(), MetricKind::RestingHeartRate);
        assert_eq!(MetricKind::Weight.polarity(), Polarity::LowerIsBetter);
        assert_eq!(MetricKind::Steps.polarity(), Polarity::HigherIsBetter);
    }
}
