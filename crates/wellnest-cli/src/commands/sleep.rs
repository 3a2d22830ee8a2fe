use chrono::Utc;
use clap::Subcommand;
use wellnest_core::Record;

use super::{print_json, Session};

#[derive(Subcommand)]
pub enum SleepAction {
    /// Log a night of sleep
    Log {
        /// Hours slept
        #[arg(long)]
        hours: f64,
        /// Quality from 1 (poor) to 5 (great)
        #[arg(long, default_value = "3")]
        quality: u8,
        /// Night being logged (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Averages and trend over the window
    Summary {
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        window: Option<u32>,
    },
}

pub fn run(action: SleepAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        SleepAction::Log {
            hours,
            quality,
            date,
        } => {
            let record = Record::Sleep {
                date: session.day(date.as_deref())?,
                hours,
                quality,
                logged_at: Utc::now(),
            };
            session.state.log(record.clone())?;
            session.save()?;
            print_json(&record)?;
        }
        SleepAction::Summary { as_of, window } => {
            let opts = session.options(as_of.as_deref(), window)?;
            print_json(&session.state.sleep_summary(&opts, &session.engine)?)?;
        }
    }
    Ok(())
}
