use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Throttling state carried between policy evaluations.
///
/// Lives for the whole process. `sleep_notification_count` is never reset,
/// so the sleep reminder budget is per process rather than per night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    pub last_in_task_notification_time: DateTime<Utc>,
    pub sleep_notification_count: u32,
}

impl Default for NotificationState {
    fn default() -> Self {
        Self {
            last_in_task_notification_time: DateTime::<Utc>::UNIX_EPOCH,
            sleep_notification_count: 0,
        }
    }
}

impl NotificationState {
    /// Record an in-task notification fired at `now`.
    pub(crate) fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_in_task_notification_time = now;
    }

    /// Seconds since the last in-task notification.
    pub fn seconds_since_check_in(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_in_task_notification_time).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn starts_at_epoch_with_no_sleep_reminders() {
        let state = NotificationState::default();
        assert_eq!(state.last_in_task_notification_time.timestamp(), 0);
        assert_eq!(state.sleep_notification_count, 0);
    }

    #[test]
    fn stamp_resets_check_in_clock() {
        let mut state = NotificationState::default();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        assert!(state.seconds_since_check_in(now) > 1_000_000);

        state.stamp(now);
        assert_eq!(state.seconds_since_check_in(now), 0);
        assert_eq!(state.seconds_since_check_in(now + chrono::Duration::seconds(90)), 90);
    }
}
