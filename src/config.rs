//! Forest configuration: where timestamps come from and how new nodes are
//! named.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use chrono::Local;
use chrono::TimeZone;
use chrono::Utc;

/// Default node name format: creation time in local time.
pub const DEFAULT_NAME_FORMAT: &str = "%H:%M:%S %Y-%m-%d";

/// A source of modification timestamps, in seconds since the Unix epoch.
pub trait Clock {
    fn now(&self) -> u64;
}

/// Reads the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        return u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(now: u64) -> ManualClock {
        return ManualClock { now: Cell::new(now) };
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        return self.now.get();
    }
}

/// Settings shared by every node in a forest.
#[derive(Clone)]
pub struct ForestConfig {
    clock: Rc<dyn Clock>,
    name_format: String,
}

impl ForestConfig {
    pub fn new() -> ForestConfig {
        return ForestConfig {
            clock: Rc::new(SystemClock),
            name_format: DEFAULT_NAME_FORMAT.to_string(),
        };
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> ForestConfig {
        self.clock = clock;
        return self;
    }

    /// Set the `strftime`-style format used for default node names.
    pub fn with_name_format(mut self, format: impl Into<String>) -> ForestConfig {
        self.name_format = format.into();
        return self;
    }

    pub fn now(&self) -> u64 {
        return self.clock.now();
    }

    pub fn name_format(&self) -> &str {
        return &self.name_format;
    }

    /// Render `timestamp` as a default node name.
    pub fn default_name(&self, timestamp: u64) -> String {
        let seconds = i64::try_from(timestamp).unwrap_or(i64::MAX);
        return match Local.timestamp_opt(seconds, 0).single() {
            Some(time) => time.format(&self.name_format).to_string(),
            None => timestamp.to_string(),
        };
    }
}

impl Default for ForestConfig {
    fn default() -> ForestConfig {
        return ForestConfig::new();
    }
}

impl fmt::Debug for ForestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("ForestConfig")
            .field("now", &self.clock.now())
            .field("name_format", &self.name_format)
            .finish();
    }
}
