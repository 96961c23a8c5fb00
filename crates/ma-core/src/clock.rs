//! Wall-clock source for time-dependent state logic
//!
//! The clear-timeout and extended-state checks compare against wall-clock
//! time. Production code uses the system clock; tests pin and advance a
//! mock so hysteresis windows can be crossed deterministically.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

/// A wall-clock source, either the system clock or a controllable mock
#[derive(Debug, Clone)]
pub enum Clock {
    /// Real time from the system clock
    System,
    /// Controlled time for tests
    Mock(Arc<RwLock<DateTime<Utc>>>),
}

impl Clock {
    /// Create a system clock
    pub fn system() -> Self {
        Clock::System
    }

    /// Create a mock clock starting at the current time
    pub fn mock() -> Self {
        Clock::Mock(Arc::new(RwLock::new(Utc::now())))
    }

    /// Create a mock clock starting at a specific time
    pub fn mock_at(time: DateTime<Utc>) -> Self {
        Clock::Mock(Arc::new(RwLock::new(time)))
    }

    /// Get the current time
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Mock(current) => *current.read().expect("clock lock poisoned"),
        }
    }

    /// Advance a mock clock by a duration; no-op on the system clock
    pub fn advance(&self, duration: Duration) {
        if let Clock::Mock(current) = self {
            let mut current = current.write().expect("clock lock poisoned");
            *current += duration;
        }
    }

    /// Advance a mock clock by seconds
    pub fn advance_seconds(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
