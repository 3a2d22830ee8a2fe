use serde::{Deserialize, Serialize};

/// Direction of a trend between two adjacent windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl TrendDirection {
    /// Swap improving and declining, for series where lower is better.
    pub fn inverted(self) -> Self {
        match self {
            TrendDirection::Improving => TrendDirection::Declining,
            TrendDirection::Declining => TrendDirection::Improving,
            TrendDirection::Stable => TrendDirection::Stable,
        }
    }
}

/// Result of comparing a recent window against the window before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Signed relative change of the recent average vs. the prior average
    pub magnitude_percent: f64,
    pub recent_average: f64,
    pub prior_average: f64,
}

impl Trend {
    pub fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            magnitude_percent: 0.0,
            recent_average: 0.0,
            prior_average: 0.0,
        }
    }
}

fn average(points: &[f64]) -> f64 {
    points.iter().sum::<f64>() / points.len() as f64
}

pub(super) fn compute(
    series: &[f64],
    recent_window: usize,
    prior_window: usize,
    threshold_percent: f64,
) -> Trend {
    let split = series.len() - recent_window.min(series.len());
    let (before, recent) = series.split_at(split);
    let prior = &before[before.len() - prior_window.min(before.len())..];

    if recent.is_empty() || prior.is_empty() {
        return Trend::stable();
    }

    let recent_average = average(recent);
    let prior_average = average(prior);

    let magnitude_percent = if prior_average == 0.0 {
        if recent_average == 0.0 {
            0.0
        } else {
            100.0_f64.copysign(recent_average)
        }
    } else {
        (recent_average - prior_average) / prior_average.abs() * 100.0
    };

    let direction = if magnitude_percent > threshold_percent {
        TrendDirection::Improving
    } else if magnitude_percent < -threshold_percent {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Trend {
        direction,
        magnitude_percent,
        recent_average,
        prior_average,
    }
}
