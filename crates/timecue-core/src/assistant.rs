//! The serialized evaluation path and the periodic tick loop.
//!
//! ```text
//! tick / manual trigger
//!   -> lock policy
//!   -> clock.now() -> resolve -> decide
//!   -> compose (if needed) -> fallback (if composition failed)
//!   -> notifier.emit
//!   -> unlock
//! ```
//!
//! The policy lock is held for the whole evaluation, including composition,
//! so a timer tick and a manual trigger never interleave state updates. A slow
//! composition delays the next evaluation by at most the retry policy's worst
//! case.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::NotificationsConfig;
use crate::llm::{ComposeOutcome, Composer};
use crate::notify::{Decision, MessageSource, Notification, NotificationPolicy, NotificationState, Notifier};
use crate::timetable::{resolve, Resolution, Timetable};

pub struct Assistant<C> {
    timetable: Timetable,
    policy: Mutex<NotificationPolicy>,
    composer: C,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    tick_period: Duration,
    grace_minutes: u32,
}

impl<C: Composer> Assistant<C> {
    pub fn new(
        timetable: Timetable,
        config: NotificationsConfig,
        composer: C,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tick_period = Duration::from_secs(config.notification_interval_seconds.max(1));
        let grace_minutes = config.grace_minutes_after_start;
        Self {
            timetable,
            policy: Mutex::new(NotificationPolicy::new(config)),
            composer,
            notifier,
            clock,
            tick_period,
            grace_minutes,
        }
    }

    pub fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Resolve the timetable at the clock's current instant.
    pub fn resolve_now(&self) -> Resolution<Tz> {
        resolve(&self.clock.now(), &self.timetable, self.grace_minutes)
    }

    /// Snapshot of the throttling state.
    pub async fn state(&self) -> NotificationState {
        self.policy.lock().await.state().clone()
    }

    /// Run one full evaluation and emit the result, if any.
    pub async fn evaluate(&self) -> Option<Notification> {
        let mut policy = self.policy.lock().await;

        if self.timetable.is_empty() {
            tracing::warn!("no timetable entries loaded, nothing to evaluate");
            return None;
        }

        let now = self.clock.now();
        let resolution = resolve(&now, &self.timetable, self.grace_minutes);
        let notification = match policy.decide(&now, &resolution) {
            Decision::Quiet => {
                tracing::debug!(now = %now, "no notification due");
                return None;
            }
            Decision::Immediate { title, message } => Notification {
                title,
                message,
                source: MessageSource::Fixed,
            },
            Decision::Compose {
                title,
                prompt,
                fallback,
            } => {
                let outcome = self.composer.compose(&prompt, &[]).await;
                finish(title, fallback, outcome)
            }
        };

        tracing::info!(
            title = %notification.title,
            source = ?notification.source,
            "notification: {}",
            notification.message
        );
        self.notifier.emit(&notification.title, &notification.message);
        drop(policy);
        Some(notification)
    }

    /// Evaluate every `notification_interval_seconds` until `shutdown` turns
    /// true or its sender is dropped. The first evaluation happens immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = self.tick_period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evaluate().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

/// Turn a composition outcome into the final notification.
pub fn finish(title: String, fallback: String, outcome: ComposeOutcome) -> Notification {
    match outcome {
        ComposeOutcome::Composed(message) => Notification {
            title,
            message,
            source: MessageSource::Composed,
        },
        ComposeOutcome::Failed {
            attempts,
            diagnostic,
        } => {
            tracing::warn!(attempts, "composition failed, using fallback: {diagnostic}");
            Notification {
                title,
                message: fallback,
                source: MessageSource::Fallback,
            }
        }
    }
}
