//! User configuration that survives restarts.

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::warn;

use crate::error::Result;
use crate::store::{KeyValueStore, SETTINGS_KEY, load_json, save_json};

pub const DEFAULT_WORK_SECS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;
pub const DEFAULT_BACKGROUND: &str = "default";

/// Longest work or break phase accepted from the user, in minutes.
pub const MAX_PHASE_MINUTES: i64 = 60;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "workDuration")]
    pub work_duration_secs: u32,
    #[serde(rename = "breakDuration")]
    pub break_duration_secs: u32,
    #[serde(rename = "autoStartBreak")]
    pub auto_start_break: bool,
    #[serde(rename = "autoStartPomodoro")]
    pub auto_start_next_work: bool,
    pub background: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration_secs: DEFAULT_WORK_SECS,
            break_duration_secs: DEFAULT_BREAK_SECS,
            auto_start_break: true,
            auto_start_next_work: true,
            background: DEFAULT_BACKGROUND.into(),
        }
    }
}

impl Settings {
    /// A stored zero duration or empty background means "never set".
    fn with_fallbacks(mut self) -> Self {
        if self.work_duration_secs == 0 {
            self.work_duration_secs = DEFAULT_WORK_SECS;
        }
        if self.break_duration_secs == 0 {
            self.break_duration_secs = DEFAULT_BREAK_SECS;
        }
        if self.background.is_empty() {
            self.background = DEFAULT_BACKGROUND.into();
        }
        self
    }
}

/// Whole minutes accepted for a work or break phase.
pub fn phase_minutes_valid(minutes: i64) -> bool {
    minutes > 0 && minutes <= MAX_PHASE_MINUTES
}

pub struct SettingsStore {
    kv: Rc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored settings, or defaults when nothing usable is stored.
    pub fn load(&self) -> Settings {
        match load_json::<Settings>(self.kv.as_ref(), SETTINGS_KEY) {
            Ok(Some(settings)) => settings.with_fallbacks(),
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!(error = %e, "stored settings unreadable, using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        save_json(self.kv.as_ref(), SETTINGS_KEY, settings)
    }
}
