pub mod backup;
pub mod config;
pub mod habit;
pub mod meditate;
pub mod metric;
pub mod sleep;
pub mod stats;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use wellnest_core::adherence::parse_day;
use wellnest_core::error::Result;
use wellnest_core::{AdherenceEngine, Config, Database, SummaryOptions, ValidationError, WellnessState};

/// Loaded state for one command invocation.
///
/// Streak caches are refreshed to `today` on open, so anything written back
/// with [`Session::save`] is current.
pub struct Session {
    pub config: Config,
    pub engine: AdherenceEngine,
    pub db: Database,
    pub state: WellnessState,
    pub today: NaiveDate,
}

impl Session {
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        let engine = config.engine()?;
        let db = Database::open()?;
        let mut state = db.load_state()?;
        let today = Local::now().date_naive();
        state.refresh(today, &engine);
        Ok(Self {
            config,
            engine,
            db,
            state,
            today,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.db.save_state(&self.state)
    }

    /// Parse an optional `YYYY-MM-DD` argument, defaulting to today.
    pub fn day(&self, input: Option<&str>) -> Result<NaiveDate, ValidationError> {
        input.map_or(Ok(self.today), parse_day)
    }

    /// Summary windows from config, overridden by command-line flags.
    pub fn options(&self, as_of: Option<&str>, window: Option<u32>) -> Result<SummaryOptions, ValidationError> {
        let mut opts = self.config.summary_options(self.day(as_of)?);
        if let Some(days) = window {
            opts.window_days = days;
        }
        Ok(opts)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
