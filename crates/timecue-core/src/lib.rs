//! # timecue Core Library
//!
//! Decision engine for a personal time-awareness assistant. Given a daily
//! timetable and the current instant, it decides whether to notify the user,
//! what to say, and composes free text through an LLM when needed. The CLI
//! binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timetable**: loading, ordering, and active/upcoming window resolution
//! - **Notification policy**: sleep reminders, transition warnings and
//!   throttled check-ins over an explicit [`NotificationState`]
//! - **LLM client**: retrying composition with an explicit [`ComposeOutcome`]
//! - **Assistant**: the serialized evaluation path and the tick loop
//!
//! ## Key Components
//!
//! - [`resolve`]: pure timetable resolution
//! - [`NotificationPolicy`]: decision core
//! - [`LlmClient`]: composition with backoff
//! - [`Assistant`]: clock → decide → compose → notify
//! - [`Config`]: TOML configuration

pub mod assistant;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod llm;
pub mod notify;
pub mod timetable;

pub use assistant::Assistant;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, LlmConfig, NotificationsConfig};
pub use duration::parse_duration;
pub use error::{ComposeError, ConfigError, CoreError, TimetableError};
pub use llm::{ChatMessage, ComposeOutcome, Composer, LlmClient, RetryPolicy};
pub use notify::{Decision, MessageSource, Notification, NotificationPolicy, NotificationState, Notifier};
pub use timetable::{resolve, EntryWindow, Resolution, Timetable, TimetableEntry};
