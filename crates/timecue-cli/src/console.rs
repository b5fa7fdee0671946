//! Console delivery and the interactive command grammar of `timecue run`.

use timecue_core::notify::truncate_message;
use timecue_core::Notifier;

/// Longest message printed before truncation.
pub const MAX_MESSAGE_CHARS: usize = 200;

pub const HELP: &str = "commands: notify | set_tz <zone> | quit";

/// Prints notifications to stdout.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn emit(&self, title: &str, message: &str) {
        println!("[{title}] {}", truncate_message(message, MAX_MESSAGE_CHARS));
    }
}

/// A line typed into the running console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Notify,
    SetTimezone(String),
    Quit,
    Help,
    Empty,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Self::Empty;
        };

        match head.to_ascii_lowercase().as_str() {
            "notify" => Self::Notify,
            "quit" | "exit" => Self::Quit,
            "help" => Self::Help,
            "set_tz" => match words.next() {
                Some(zone) => Self::SetTimezone(zone.to_string()),
                None => Self::Unknown(line.trim().to_string()),
            },
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}
