use chrono::Utc;
use clap::Subcommand;
use wellnest_core::Record;

use super::{print_json, Session};

#[derive(Subcommand)]
pub enum MeditateAction {
    /// Log a meditation session
    Log {
        /// Session length in minutes
        #[arg(long)]
        minutes: u32,
        /// Day of the session (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Sessions, minutes, streaks and trend over the window
    Summary {
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        window: Option<u32>,
    },
}

pub fn run(action: MeditateAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        MeditateAction::Log { minutes, date } => {
            let record = Record::Meditation {
                date: session.day(date.as_deref())?,
                minutes,
                logged_at: Utc::now(),
            };
            session.state.log(record.clone())?;
            session.save()?;
            print_json(&record)?;
        }
        MeditateAction::Summary { as_of, window } => {
            let opts = session.options(as_of.as_deref(), window)?;
            print_json(&session.state.meditation_summary(&opts, &session.engine)?)?;
        }
    }
    Ok(())
}
