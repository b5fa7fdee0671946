use std::sync::Mutex;

use serde::Serialize;

/// Where a notification's message text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    /// Fixed text chosen by the policy.
    Fixed,
    /// Composed by the LLM client.
    Composed,
    /// Composition failed; deterministic default.
    Fallback,
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub source: MessageSource,
}

/// Delivery collaborator.
///
/// Fire-and-forget: implementations handle their own failures (log, fall
/// back to the console) and never report them to the scheduler.
pub trait Notifier: Send + Sync {
    fn emit(&self, title: &str, message: &str);
}

/// Keeps every emitted notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(title, message)` pairs in emission order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn emit(&self, title: &str, message: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((title.to_string(), message.to_string()));
        }
    }
}

/// Cut `message` to `max_chars` characters, marking the cut with `...`.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let kept: String = message.chars().take(max_chars).collect();
    format!("{kept}...")
}
