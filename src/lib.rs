//! tritimer - a focus timer with pomodoro, stopwatch and countdown modes.
//!
//! The [`engine::TimerEngine`] is a plain state machine: commands go in, and
//! display updates and completion signals come out through the traits in
//! [`events`]. Settings and daily statistics live in a small JSON key-value
//! store ([`store`]).

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod notify;
pub mod settings;
pub mod stats;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{TimerEngine, TimerMode, TimerState};
pub use error::StoreError;
pub use events::{Completion, DisplaySink, DisplayUpdate, NotificationSink};
pub use settings::{Settings, SettingsStore};
pub use stats::{Stats, StatsStore};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
