//! The notification decision core.
//!
//! Branches, first match wins:
//!
//! 1. Active "sleep" with reminder budget left: fixed bedtime reminder at the
//!    start of the window and once more after the follow-up interval. While
//!    the budget lasts nothing else is considered during sleep.
//! 2. Active named task and the check-in interval elapsed: composed check-in.
//! 3. Upcoming entry within the lead window (or just started): transition
//!    message. Fixed text for sleep, composed otherwise.
//! 4. Nothing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use indoc::formatdoc;

use super::state::NotificationState;
use crate::config::NotificationsConfig;
use crate::timetable::{EntryWindow, Resolution};

/// Active-task name that means "nothing scheduled".
pub const NO_SPECIFIC_TASK: &str = "no specific task";

pub const SLEEP_TITLE: &str = "Current Task: Sleep";
pub const SLEEP_MESSAGE: &str = "It's sleep time! Time to unwind and rest for tomorrow!";
pub const BEDTIME_TITLE: &str = "Time for Bed!";

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to send this tick.
    Quiet,
    /// Final text, ready to send.
    Immediate { title: String, message: String },
    /// Text must be composed from `prompt`; `fallback` is sent if that fails.
    Compose {
        title: String,
        prompt: String,
        fallback: String,
    },
}

impl Decision {
    pub fn title(&self) -> Option<&str> {
        match self {
            Decision::Quiet => None,
            Decision::Immediate { title, .. } | Decision::Compose { title, .. } => Some(title),
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Decision::Quiet)
    }
}

/// Stateful notification policy. Owns its [`NotificationState`].
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    config: NotificationsConfig,
    state: NotificationState,
}

impl NotificationPolicy {
    pub fn new(config: NotificationsConfig) -> Self {
        Self::with_state(config, NotificationState::default())
    }

    pub fn with_state(config: NotificationsConfig, state: NotificationState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &NotificationsConfig {
        &self.config
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// Decide what to send at `now`, updating throttling state when a
    /// sleep reminder or check-in fires.
    pub fn decide<Tz: TimeZone>(&mut self, now: &DateTime<Tz>, resolution: &Resolution<Tz>) -> Decision {
        let now_utc = now.with_timezone(&Utc);
        let active = resolution
            .active
            .as_ref()
            .filter(|w| !w.entry.task.eq_ignore_ascii_case(NO_SPECIFIC_TASK));

        if let Some(window) = active.filter(|w| w.entry.is_sleep()) {
            if self.state.sleep_notification_count < self.config.max_sleep_notifications {
                return self.sleep_reminder(now, now_utc, window);
            }
        }

        if let Some(window) = active {
            let since = self.state.seconds_since_check_in(now_utc);
            let interval = i64::try_from(self.config.notification_interval_seconds).unwrap_or(i64::MAX);
            if since >= interval {
                self.state.stamp(now_utc);
                let decision = check_in(window);
                tracing::info!(task = %window.entry.task, "check-in due");
                return decision;
            }
            tracing::debug!(task = %window.entry.task, since, interval, "check-in not due");
        }

        self.transition(now, resolution, active).unwrap_or(Decision::Quiet)
    }

    fn sleep_reminder<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        now_utc: DateTime<Utc>,
        window: &EntryWindow<Tz>,
    ) -> Decision {
        let elapsed = now.clone() - window.start.clone();
        let follow_up = Duration::minutes(i64::from(self.config.sleep_follow_up_interval_minutes));
        let at_start = elapsed <= Duration::zero();
        let second_reminder = elapsed >= follow_up && self.state.sleep_notification_count == 1;

        if !(at_start || second_reminder) {
            return Decision::Quiet;
        }

        self.state.sleep_notification_count += 1;
        self.state.stamp(now_utc);
        tracing::info!(
            count = self.state.sleep_notification_count,
            max = self.config.max_sleep_notifications,
            "sleep reminder"
        );
        Decision::Immediate {
            title: SLEEP_TITLE.to_string(),
            message: SLEEP_MESSAGE.to_string(),
        }
    }

    fn transition<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        resolution: &Resolution<Tz>,
        active: Option<&EntryWindow<Tz>>,
    ) -> Option<Decision> {
        let upcoming = resolution.upcoming.as_ref()?;
        let until = upcoming.start.clone() - now.clone();
        let lead = Duration::minutes(i64::from(self.config.minutes_before_task));
        let in_lead = until >= Duration::zero() && until <= lead;

        if !(in_lead || resolution.upcoming_just_started) {
            return None;
        }

        let entry = &upcoming.entry;
        let minutes = resolution.minutes_until_upcoming;

        if entry.is_sleep() {
            let message = if minutes > 0 {
                format!("Scheduled to sleep in {minutes} minutes. Wind down!")
            } else {
                format!("It's past {}. Time to rest!", entry.time_label())
            };
            tracing::info!("bedtime approaching");
            return Some(Decision::Immediate {
                title: BEDTIME_TITLE.to_string(),
                message,
            });
        }

        let description = if resolution.upcoming_just_started {
            match (now.clone() - upcoming.start.clone()).num_minutes() {
                0 => "just started".to_string(),
                passed => format!("started {passed} minutes ago"),
            }
        } else if minutes == 0 {
            "is starting now".to_string()
        } else {
            format!("in {} minutes", minutes.abs())
        };

        let current = active.map_or(NO_SPECIFIC_TASK, |w| w.entry.task.as_str());
        let prompt = formatdoc! {"
            Current task: '{current}'.
            Next task: '{next}' at {time} ({description}) with notes: '{notes}'.
            Write a short, encouraging notification (under 100 characters) to help me switch to the next task.",
            current = current,
            next = entry.task,
            time = entry.time_label(),
            description = description,
            notes = entry.notes,
        };

        tracing::info!(task = %entry.task, %description, "upcoming task");
        Some(Decision::Compose {
            title: format!("Upcoming: {}", entry.task),
            prompt,
            fallback: format!("Prepare for: {} at {}.", entry.task, entry.time_label()),
        })
    }
}

fn check_in<Tz: TimeZone>(window: &EntryWindow<Tz>) -> Decision {
    let task = &window.entry.task;
    let prompt = formatdoc! {"
        Current task: '{task}' with notes: '{notes}'.
        Write a short, encouraging check-in (under 100 characters) for this task.",
        task = task,
        notes = window.entry.notes,
    };
    Decision::Compose {
        title: format!("Check-in: {task}"),
        prompt,
        fallback: format!("Doing: {task}. Keep it up!"),
    }
}
