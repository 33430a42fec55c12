//! Time source for the engine.
//!
//! Stats are keyed by the UTC calendar day, so a record written near
//! midnight means the same day to every reader of the store.

use chrono::{DateTime, NaiveDate, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Wall-clock source for the engine.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Current calendar day in UTC.
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can keep one handle and give another to the engine.
#[derive(Clone, Default)]
pub struct ManualClock {
    millis: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Rc::new(Cell::new(start_millis)),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.get()
    }

    fn today(&self) -> NaiveDate {
        DateTime::from_timestamp_millis(self.millis.get())
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }
}
