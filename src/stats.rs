//! Daily focus statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{KeyValueStore, STATS_KEY, load_json, save_json};

/// Counters for a single calendar day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stats {
    pub date: NaiveDate,
    #[serde(rename = "pomodoroCount", default)]
    pub completed_work_cycles: u32,
    #[serde(rename = "totalFocusTime", default)]
    pub total_focus_secs: u64,
}

impl Stats {
    pub fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            completed_work_cycles: 0,
            total_focus_secs: 0,
        }
    }

    /// Credit one finished work phase.
    pub fn record_work_cycle(&mut self, focus_secs: u32) {
        self.completed_work_cycles += 1;
        self.total_focus_secs += u64::from(focus_secs);
    }

    /// Zero the counters if `today` is a later day than the one recorded.
    /// Returns true when a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        *self = Self::zeroed(today);
        true
    }
}

pub struct StatsStore {
    kv: Rc<dyn KeyValueStore>,
}

impl StatsStore {
    pub fn new(kv: Rc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Today's counters. Anything recorded for another day is discarded.
    pub fn load(&self, today: NaiveDate) -> Stats {
        match load_json::<Stats>(self.kv.as_ref(), STATS_KEY) {
            Ok(Some(stats)) if stats.date == today => stats,
            Ok(Some(stats)) => {
                debug!(stored = %stats.date, %today, "stats belong to another day, starting fresh");
                Stats::zeroed(today)
            }
            Ok(None) => Stats::zeroed(today),
            Err(e) => {
                warn!(error = %e, "stored stats unreadable, starting fresh");
                Stats::zeroed(today)
            }
        }
    }

    pub fn save(&self, stats: &Stats) -> Result<()> {
        save_json(self.kv.as_ref(), STATS_KEY, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store() -> (StatsStore, Rc<MemoryStore>) {
        let kv = Rc::new(MemoryStore::new());
        (StatsStore::new(kv.clone()), kv)
    }

    #[test]
    fn empty_store_gives_zeroed_today() {
        let (stats, _) = store();
        assert_eq!(stats.load(day("2024-01-01")), Stats::zeroed(day("2024-01-01")));
    }

    #[test]
    fn same_day_record_is_kept() {
        let (stats, _) = store();
        let mut s = Stats::zeroed(day("2024-01-01"));
        s.record_work_cycle(1500);
        s.record_work_cycle(1500);
        stats.save(&s).unwrap();

        let loaded = stats.load(day("2024-01-01"));
        assert_eq!(loaded.completed_work_cycles, 2);
        assert_eq!(loaded.total_focus_secs, 3000);
    }

    #[test]
    fn next_day_resets_counters() {
        let (stats, kv) = store();
        kv.set(STATS_KEY, r#"{"date": "2024-01-01", "pomodoroCount": 4, "totalFocusTime": 6000}"#)
            .unwrap();

        let loaded = stats.load(day("2024-01-02"));
        assert_eq!(loaded.date, day("2024-01-02"));
        assert_eq!(loaded.completed_work_cycles, 0);
        assert_eq!(loaded.total_focus_secs, 0);
    }

    #[test]
    fn wire_format_uses_camel_case_keys() {
        let (stats, kv) = store();
        let mut s = Stats::zeroed(day("2024-03-09"));
        s.record_work_cycle(900);
        stats.save(&s).unwrap();

        let raw = kv.get(STATS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["date"], "2024-03-09");
        assert_eq!(value["pomodoroCount"], 1);
        assert_eq!(value["totalFocusTime"], 900);
    }

    #[test]
    fn unreadable_record_starts_fresh() {
        let (stats, kv) = store();
        kv.set(STATS_KEY, r#"{"date": "yesterday"}"#).unwrap();
        assert_eq!(stats.load(day("2024-01-02")), Stats::zeroed(day("2024-01-02")));
    }

    #[test]
    fn roll_over_only_on_new_day() {
        let mut s = Stats::zeroed(day("2024-01-01"));
        s.record_work_cycle(60);
        assert!(!s.roll_over(day("2024-01-01")));
        assert_eq!(s.completed_work_cycles, 1);
        assert!(s.roll_over(day("2024-01-02")));
        assert_eq!(s, Stats::zeroed(day("2024-01-02")));
    }
}
