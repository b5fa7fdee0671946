//! Injectable "now".
//!
//! Every evaluation reads the current instant through [`Clock`], already
//! converted into the configured time zone, so the decision path can be
//! driven from tests with [`FixedClock`].

use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock in a time zone that can be switched at runtime.
#[derive(Debug)]
pub struct SystemClock {
    tz: RwLock<Tz>,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz: RwLock::new(tz) }
    }

    pub fn timezone(&self) -> Tz {
        self.tz.read().map(|tz| *tz).unwrap_or(Tz::UTC)
    }

    pub fn set_timezone(&self, tz: Tz) {
        if let Ok(mut current) = self.tz.write() {
            *current = tz;
        }
        tracing::info!(timezone = %tz, "time zone changed");
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone())
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Tz>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.now.lock() {
            *current += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
