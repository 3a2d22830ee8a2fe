use chrono::Utc;
use clap::Subcommand;
use wellnest_core::{MetricKind, Record};

use super::{print_json, Session};

#[derive(Subcommand)]
pub enum MetricAction {
    /// Log a metric reading
    Log {
        /// weight, resting_heart_rate, steps, water, mood or energy
        metric: String,
        /// Reading
        value: f64,
        /// Day of the reading (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Latest value, window average and trend for one metric
    Summary {
        metric: String,
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        window: Option<u32>,
    },
}

pub fn run(action: MetricAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        MetricAction::Log {
            metric,
            value,
            date,
        } => {
            let metric: MetricKind = metric.parse()?;
            let record = Record::Metric {
                date: session.day(date.as_deref())?,
                metric,
                value,
                logged_at: Utc::now(),
            };
            session.state.log(record.clone())?;
            session.save()?;
            print_json(&record)?;
        }
        MetricAction::Summary {
            metric,
            as_of,
            window,
        } => {
            let metric: MetricKind = metric.parse()?;
            let opts = session.options(as_of.as_deref(), window)?;
            print_json(&session.state.metric_summary(metric, &opts, &session.engine)?)?;
        }
    }
    Ok(())
}
