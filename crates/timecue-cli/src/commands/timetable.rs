use std::path::Path;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum TimetableAction {
    /// List entries in time order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(config_path: &Path, action: TimetableAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, timetable) = super::load(config_path)?;

    match action {
        TimetableAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&timetable)?);
                return Ok(());
            }
            if timetable.is_empty() {
                println!("No entries.");
                return Ok(());
            }
            for entry in timetable.entries() {
                let duration = entry.duration.as_deref().unwrap_or("-");
                println!("{}  {:<24} {:>6}  {}", entry.time_label(), entry.task, duration, entry.notes);
            }
            for skipped in timetable.skipped() {
                eprintln!("skipped #{}: {} {} ({})", skipped.index, skipped.time, skipped.task, skipped.reason);
            }
        }
    }
    Ok(())
}
