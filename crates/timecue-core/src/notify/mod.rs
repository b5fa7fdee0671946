//! Notification decisions and delivery seam.

pub mod notifier;
pub mod policy;
pub mod state;

pub use notifier::{truncate_message, MessageSource, Notification, Notifier, RecordingNotifier};
pub use policy::{Decision, NotificationPolicy, BEDTIME_TITLE, NO_SPECIFIC_TASK, SLEEP_MESSAGE, SLEEP_TITLE};
pub use state::NotificationState;
