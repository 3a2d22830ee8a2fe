//! Habit commands: create, toggle, remove and inspect tracked items.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use wellnest_core::adherence::format_day;
use wellnest_core::Category;

use super::{print_json, Session};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a habit
    Add {
        /// Habit name
        name: String,
        /// health, fitness, mindfulness, nutrition, productivity, learning, social or other
        #[arg(long, default_value = "health")]
        category: String,
    },
    /// List habits with streaks and completion rates
    List {
        /// Evaluate as of this day (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<String>,
        /// Completion-rate window in days
        #[arg(long)]
        window: Option<u32>,
    },
    /// Mark a day done, or undo it if already done
    Toggle {
        /// Habit ID or unique prefix
        id: String,
        /// Day to toggle (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a habit and its history
    Delete {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Adherence summary for one habit
    Stats {
        /// Habit ID or unique prefix
        id: String,
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        window: Option<u32>,
    },
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        HabitAction::Add { name, category } => {
            let category: Category = category.parse()?;
            let id = session.state.add_item(&name, category, Utc::now())?;
            session.save()?;
            if let Some(item) = session.state.item(&id) {
                print_json(item)?;
            }
        }
        HabitAction::List { as_of, window } => {
            let opts = session.options(as_of.as_deref(), window)?;
            let summaries = session.state.item_summaries(&opts, &session.engine)?;
            print_json(&summaries)?;
        }
        HabitAction::Toggle { id, date } => {
            let id = session.state.resolve_id(&id)?;
            let day = session.day(date.as_deref())?;
            let today = session.today;
            let completed = session
                .state
                .toggle(&id, day, Utc::now(), today, &session.engine)?;
            session.save()?;

            if let Some(item) = session.state.item(&id) {
                print_json(&json!({
                    "id": item.id,
                    "name": item.name,
                    "date": format_day(day),
                    "completed": completed,
                    "current_streak": item.current_streak,
                    "best_streak": item.best_streak,
                }))?;
            }
        }
        HabitAction::Delete { id } => {
            let id = session.state.resolve_id(&id)?;
            let removed = session.state.delete_item(&id)?;
            session.save()?;
            print_json(&json!({
                "deleted": removed.id,
                "name": removed.name,
                "completions": removed.records.len(),
            }))?;
        }
        HabitAction::Stats { id, as_of, window } => {
            let id = session.state.resolve_id(&id)?;
            let opts = session.options(as_of.as_deref(), window)?;
            let summary = session.state.item_summary(&id, &opts, &session.engine)?;
            print_json(&summary)?;
        }
    }
    Ok(())
}
