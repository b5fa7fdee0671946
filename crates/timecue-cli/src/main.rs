use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "timecue", version, about = "Timetable-aware notification assistant")]
struct Cli {
    /// Config file (default: ~/.config/timecue/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the notification scheduler with an interactive console
    Run,
    /// Evaluate once and print the resulting notification
    Notify,
    /// Print the active and upcoming entries as JSON
    Status {
        /// Resolve at this time today instead of now (HH:MM)
        #[arg(long)]
        at: Option<String>,
    },
    /// Timetable inspection
    Timetable {
        #[command(subcommand)]
        action: commands::timetable::TimetableAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TIMECUE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let path = commands::config_path(cli.config)?;
    match cli.command {
        Commands::Run => commands::run::run(&path),
        Commands::Notify => commands::run::notify_once(&path),
        Commands::Status { at } => commands::status::run(&path, at.as_deref()),
        Commands::Timetable { action } => commands::timetable::run(&path, action),
        Commands::Config { action } => commands::config::run(&path, action),
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
