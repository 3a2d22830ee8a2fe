use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wellnest_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "wellnest", version, about = "Wellnest habit and wellness tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit tracking
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Sleep journal
    Sleep {
        #[command(subcommand)]
        action: commands::sleep::SleepAction,
    },
    /// Meditation journal
    Meditate {
        #[command(subcommand)]
        action: commands::meditate::MeditateAction,
    },
    /// Health metrics
    Metric {
        #[command(subcommand)]
        action: commands::metric::MetricAction,
    },
    /// Overview, points and milestones
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Backups in an S3-compatible bucket
    Backup {
        #[command(subcommand)]
        action: commands::backup::BackupAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("WELLNEST_LOG").unwrap_or_else(|_| {
        let level = Config::load()
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Sleep { action } => commands::sleep::run(action),
        Commands::Meditate { action } => commands::meditate::run(action),
        Commands::Metric { action } => commands::metric::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Backup { action } => commands::backup::run(action),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
