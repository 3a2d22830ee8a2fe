use clap::Subcommand;
use serde_json::json;
use wellnest_core::adherence::format_day;
use wellnest_core::motivation;
use wellnest_core::{MetricKind, Record};

use super::{print_json, Session};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Every tracker at a glance
    Overview {
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        window: Option<u32>,
    },
    /// Points, level, streak milestones and the quote of the day, counting
    /// only entries dated on or before the day
    Motivation {
        #[arg(long)]
        as_of: Option<String>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;

    match action {
        StatsAction::Overview { as_of, window } => {
            let opts = session.options(as_of.as_deref(), window)?;
            let engine = &session.engine;
            let state = &session.state;

            let logged: Vec<MetricKind> = MetricKind::ALL
                .into_iter()
                .filter(|kind| {
                    state
                        .journal
                        .iter()
                        .any(|r| matches!(r, Record::Metric { metric, .. } if metric == kind))
                })
                .collect();
            let metrics = logged
                .into_iter()
                .map(|kind| state.metric_summary(kind, &opts, engine))
                .collect::<Result<Vec<_>, _>>()?;

            print_json(&json!({
                "as_of": format_day(opts.as_of),
                "habits": state.item_summaries(&opts, engine)?,
                "sleep": state.sleep_summary(&opts, engine)?,
                "meditation": state.meditation_summary(&opts, engine)?,
                "metrics": metrics,
            }))?;
        }
        StatsAction::Motivation { as_of } => {
            let day = session.day(as_of.as_deref())?;
            let state = session.state.as_of(day, &session.engine);
            print_json(&motivation::report(&state, day))?;
        }
    }
    Ok(())
}
