//! The timer state machine.
//!
//! One engine owns one timer. Commands mutate it synchronously; the recurring
//! tick and the delayed auto-start after a completed phase are deadlines the
//! engine keeps itself and fires from [`TimerEngine::poll`]. Cancelling either
//! is just dropping the deadline, so a cancelled tick can never run.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::events::{Completion, DisplaySink, DisplayUpdate, NotificationSink};
use crate::format::{format_clock, format_focus};
use crate::settings::{Settings, SettingsStore, phase_minutes_valid};
use crate::stats::{Stats, StatsStore};

pub const TICK_MILLIS: i64 = 1_000;
pub const AUTO_START_DELAY_MILLIS: i64 = 1_000;

/// Length of the stopwatch's repeating progress cycle.
pub const STOPWATCH_CYCLE_SECS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    Pomodoro,
    Stopwatch,
    Countdown,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [Self::Pomodoro, Self::Stopwatch, Self::Countdown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pomodoro => "pomodoro",
            Self::Stopwatch => "stopwatch",
            Self::Countdown => "countdown",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::Stopwatch => "Stopwatch",
            Self::Countdown => "Countdown",
        }
    }

    fn counts_down(&self) -> bool {
        !matches!(self, Self::Stopwatch)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pomodoro" => Ok(Self::Pomodoro),
            "stopwatch" => Ok(Self::Stopwatch),
            "countdown" | "timer" => Ok(Self::Countdown),
            other => Err(format!("unknown mode '{other}' (pomodoro, stopwatch, countdown)")),
        }
    }
}

/// Everything the engine knows about the current timer.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerState {
    pub mode: TimerMode,
    pub running: bool,
    pub paused: bool,
    pub remaining_secs: u64,
    pub elapsed_secs: u64,
    pub is_break_phase: bool,
    pub work_duration_secs: u32,
    pub break_duration_secs: u32,
    pub auto_start_break: bool,
    pub auto_start_next_work: bool,
    pub start_epoch_millis: Option<i64>,
    /// Last length accepted by `set_countdown_duration`, 0 if none yet.
    pub countdown_total_secs: u64,
    /// Set when a countdown reaches zero, cleared by the next command.
    pub countdown_finished: bool,
}

impl TimerState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: TimerMode::Pomodoro,
            running: false,
            paused: false,
            remaining_secs: u64::from(settings.work_duration_secs),
            elapsed_secs: 0,
            is_break_phase: false,
            work_duration_secs: settings.work_duration_secs,
            break_duration_secs: settings.break_duration_secs,
            auto_start_break: settings.auto_start_break,
            auto_start_next_work: settings.auto_start_next_work,
            start_epoch_millis: None,
            countdown_total_secs: 0,
            countdown_finished: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.running && !self.paused
    }

    /// Length of the pomodoro phase currently shown.
    pub fn pomodoro_phase_secs(&self) -> u64 {
        if self.is_break_phase {
            u64::from(self.break_duration_secs)
        } else {
            u64::from(self.work_duration_secs)
        }
    }

    /// Seconds shown on the clock face.
    pub fn display_secs(&self) -> u64 {
        match self.mode {
            TimerMode::Stopwatch => self.elapsed_secs,
            _ => self.remaining_secs,
        }
    }

    pub fn progress(&self) -> f64 {
        let fraction = match self.mode {
            TimerMode::Pomodoro => ratio(self.remaining_secs, self.pomodoro_phase_secs()),
            TimerMode::Countdown => ratio(self.remaining_secs, self.countdown_total_secs),
            TimerMode::Stopwatch => {
                (self.elapsed_secs % STOPWATCH_CYCLE_SECS) as f64 / STOPWATCH_CYCLE_SECS as f64
            }
        };
        fraction.clamp(0.0, 1.0)
    }

    pub fn status_label(&self) -> &'static str {
        if self.running {
            return match self.mode {
                TimerMode::Pomodoro if self.is_break_phase => "On break",
                TimerMode::Pomodoro => "Focusing",
                TimerMode::Countdown => "Counting down",
                TimerMode::Stopwatch => "Timing",
            };
        }
        if self.paused {
            return "Paused";
        }
        match self.mode {
            TimerMode::Pomodoro if self.is_break_phase => "Ready for break",
            TimerMode::Pomodoro => "Ready to focus",
            TimerMode::Countdown if self.countdown_finished => "Time's up",
            TimerMode::Countdown => "Set a countdown",
            TimerMode::Stopwatch => "Ready",
        }
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    Tick(i64),
    AutoStart(i64),
}

/// Pending deadlines, in epoch milliseconds.
#[derive(Default, Debug)]
struct Schedule {
    next_tick: Option<i64>,
    auto_start: Option<i64>,
}

impl Schedule {
    /// Earliest task due at or before `now`. Ticks win ties.
    fn due(&self, now: i64) -> Option<Task> {
        let tick = self.next_tick.filter(|&at| at <= now).map(Task::Tick);
        let auto = self.auto_start.filter(|&at| at <= now).map(Task::AutoStart);
        match (tick, auto) {
            (Some(Task::Tick(t)), Some(Task::AutoStart(a))) if a < t => auto,
            (Some(_), _) => tick,
            (None, _) => auto,
        }
    }

    fn earliest(&self) -> Option<i64> {
        match (self.next_tick, self.auto_start) {
            (Some(t), Some(a)) => Some(t.min(a)),
            (t, a) => t.or(a),
        }
    }

    fn cancel_all(&mut self) {
        self.next_tick = None;
        self.auto_start = None;
    }
}

pub struct TimerEngine<D: DisplaySink, N: NotificationSink> {
    state: TimerState,
    settings: Settings,
    stats: Stats,
    settings_store: SettingsStore,
    stats_store: StatsStore,
    clock: Box<dyn Clock>,
    display: D,
    notifier: N,
    schedule: Schedule,
}

impl<D: DisplaySink, N: NotificationSink> TimerEngine<D, N> {
    /// Load settings and today's stats and build an idle pomodoro timer.
    pub fn new(
        settings_store: SettingsStore,
        stats_store: StatsStore,
        clock: Box<dyn Clock>,
        display: D,
        notifier: N,
    ) -> Self {
        let settings = settings_store.load();
        let stats = stats_store.load(clock.today());
        debug!(?settings, ?stats, "timer engine loaded");

        Self {
            state: TimerState::from_settings(&settings),
            settings,
            stats,
            settings_store,
            stats_store,
            clock,
            display,
            notifier,
            schedule: Schedule::default(),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Whether a delayed auto-start is waiting to fire.
    pub fn auto_start_pending(&self) -> bool {
        self.schedule.auto_start.is_some()
    }

    /// Time of the next scheduled tick or auto-start, if any.
    pub fn next_deadline(&self) -> Option<i64> {
        self.schedule.earliest()
    }

    /// What the display adapter would be told right now.
    pub fn snapshot(&self) -> DisplayUpdate {
        DisplayUpdate {
            display: format_clock(self.state.display_secs()),
            progress: self.state.progress(),
            status: self.state.status_label().to_string(),
        }
    }

    /// Push the full current picture to the display adapter.
    pub fn refresh(&mut self) {
        self.observe_day();
        self.emit_stats();
        self.emit_update();
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: TimerMode) {
        self.stop_all();
        self.state.mode = mode;
        self.state.elapsed_secs = 0;
        match mode {
            TimerMode::Pomodoro => {
                self.state.is_break_phase = false;
                self.state.remaining_secs = u64::from(self.state.work_duration_secs);
            }
            TimerMode::Stopwatch => {}
            TimerMode::Countdown => {
                self.state.remaining_secs = self.state.countdown_total_secs;
            }
        }
        debug!(%mode, "mode changed");
        self.emit_update();
    }

    pub fn start(&mut self) {
        let now = self.clock.now_millis();
        self.start_at(now);
    }

    pub fn pause(&mut self) {
        self.schedule.auto_start = None;
        if !self.state.running {
            return;
        }
        self.schedule.next_tick = None;
        self.state.running = false;
        self.state.paused = true;
        debug!(remaining = self.state.remaining_secs, elapsed = self.state.elapsed_secs, "paused");
        self.emit_update();
    }

    pub fn reset(&mut self) {
        self.stop_all();
        match self.state.mode {
            TimerMode::Pomodoro => self.state.remaining_secs = self.state.pomodoro_phase_secs(),
            TimerMode::Countdown => {}
            TimerMode::Stopwatch => self.state.elapsed_secs = 0,
        }
        debug!(mode = %self.state.mode, "reset");
        self.emit_update();
    }

    /// Pause when running, otherwise start.
    pub fn toggle(&mut self) {
        if self.state.running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Ignored unless the total is positive.
    pub fn set_countdown_duration(&mut self, hours: i64, minutes: i64, seconds: i64) {
        let total = hours
            .checked_mul(3600)
            .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(seconds));
        let Some(total) = total.filter(|&t| t > 0) else {
            debug!(hours, minutes, seconds, "countdown duration rejected");
            return;
        };

        let total = total as u64;
        self.state.countdown_total_secs = total;
        self.state.countdown_finished = false;
        if self.state.mode == TimerMode::Countdown {
            self.state.remaining_secs = total;
        }
        debug!(total, "countdown duration set");
        self.emit_update();
    }

    pub fn set_work_duration(&mut self, minutes: i64) {
        self.set_phase_duration(minutes, false);
    }

    pub fn set_break_duration(&mut self, minutes: i64) {
        self.set_phase_duration(minutes, true);
    }

    pub fn set_auto_start_break(&mut self, enabled: bool) {
        self.state.auto_start_break = enabled;
        self.settings.auto_start_break = enabled;
        self.persist_settings();
    }

    pub fn set_auto_start_next_work(&mut self, enabled: bool) {
        self.state.auto_start_next_work = enabled;
        self.settings.auto_start_next_work = enabled;
        self.persist_settings();
    }

    pub fn set_background(&mut self, id: &str) {
        self.settings.background = id.to_string();
        self.persist_settings();
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Run every tick and auto-start that has come due.
    ///
    /// Seconds missed while nobody polled are applied as one step, so a late
    /// poll finishes at most one phase. A deferred auto-start fires relative to
    /// `now`, never in the past.
    pub fn poll(&mut self) {
        let now = self.clock.now_millis();
        if self.observe_day() {
            self.emit_stats();
        }

        while let Some(task) = self.schedule.due(now) {
            match task {
                Task::Tick(at) => {
                    let secs = (now - at) / TICK_MILLIS + 1;
                    self.schedule.next_tick = Some(at + secs * TICK_MILLIS);
                    if secs > 1 {
                        debug!(secs, "catching up on missed ticks");
                    }
                    self.tick(secs as u64, now);
                }
                Task::AutoStart(_) => {
                    self.schedule.auto_start = None;
                    debug!("auto-starting next phase");
                    self.start_at(now);
                }
            }
        }
    }

    fn start_at(&mut self, at: i64) {
        self.schedule.auto_start = None;
        if self.state.running {
            return;
        }
        if self.state.mode.counts_down() && self.state.remaining_secs == 0 {
            debug!(mode = %self.state.mode, "nothing to count down");
            return;
        }

        self.state.running = true;
        self.state.paused = false;
        self.state.countdown_finished = false;
        self.state.start_epoch_millis = Some(at - self.state.elapsed_secs as i64 * 1000);
        self.schedule.next_tick = Some(at + TICK_MILLIS);
        debug!(mode = %self.state.mode, "started");
        self.emit_update();
    }

    fn tick(&mut self, secs: u64, now: i64) {
        if self.state.mode.counts_down() {
            self.state.remaining_secs = self.state.remaining_secs.saturating_sub(secs);
            if self.state.remaining_secs == 0 {
                self.complete(now);
                return;
            }
        } else if let Some(anchor) = self.state.start_epoch_millis {
            self.state.elapsed_secs = ((now - anchor).max(0) / 1000) as u64;
        }
        self.emit_update();
    }

    fn complete(&mut self, now: i64) {
        self.schedule.next_tick = None;
        self.state.running = false;
        self.state.paused = false;
        self.state.start_epoch_millis = None;

        let completion = match self.state.mode {
            TimerMode::Pomodoro if !self.state.is_break_phase => {
                self.observe_day();
                self.stats.record_work_cycle(self.state.work_duration_secs);
                self.persist_stats();
                self.emit_stats();

                self.state.is_break_phase = true;
                self.state.remaining_secs = u64::from(self.state.break_duration_secs);
                if self.state.auto_start_break {
                    self.schedule.auto_start = Some(now + AUTO_START_DELAY_MILLIS);
                }
                Completion::WorkFinished
            }
            TimerMode::Pomodoro => {
                self.state.is_break_phase = false;
                self.state.remaining_secs = u64::from(self.state.work_duration_secs);
                if self.state.auto_start_next_work {
                    self.schedule.auto_start = Some(now + AUTO_START_DELAY_MILLIS);
                }
                Completion::BreakFinished
            }
            TimerMode::Countdown => {
                self.state.countdown_finished = true;
                Completion::CountdownFinished
            }
            TimerMode::Stopwatch => return,
        };

        info!(
            ?completion,
            completed_today = self.stats.completed_work_cycles,
            auto_start = self.schedule.auto_start.is_some(),
            "phase complete"
        );
        self.notifier.notify_completion(completion);
        self.emit_update();
    }

    /// Cancel every deadline and drop back to idle without touching values.
    fn stop_all(&mut self) {
        self.schedule.cancel_all();
        self.state.running = false;
        self.state.paused = false;
        self.state.countdown_finished = false;
        self.state.start_epoch_millis = None;
    }

    fn set_phase_duration(&mut self, minutes: i64, is_break: bool) {
        if !phase_minutes_valid(minutes) {
            debug!(minutes, is_break, "phase duration rejected");
            return;
        }

        let secs = minutes as u32 * 60;
        if is_break {
            self.state.break_duration_secs = secs;
            self.settings.break_duration_secs = secs;
        } else {
            self.state.work_duration_secs = secs;
            self.settings.work_duration_secs = secs;
        }
        self.persist_settings();

        let shown = self.state.mode == TimerMode::Pomodoro && self.state.is_break_phase == is_break;
        if self.state.is_idle() && shown {
            self.state.remaining_secs = u64::from(secs);
        }
        self.emit_update();
    }

    /// Returns true when the stats were rolled over to a new day.
    fn observe_day(&mut self) -> bool {
        let today = self.clock.today();
        if !self.stats.roll_over(today) {
            return false;
        }
        info!(%today, "new day, stats reset");
        self.persist_stats();
        true
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings_store.save(&self.settings) {
            warn!(error = %e, "failed to save settings");
        }
    }

    fn persist_stats(&self) {
        if let Err(e) = self.stats_store.save(&self.stats) {
            warn!(error = %e, "failed to save stats");
        }
    }

    fn emit_update(&mut self) {
        let update = self.snapshot();
        self.display.on_update(&update);
    }

    fn emit_stats(&mut self) {
        let focus = format_focus(self.stats.total_focus_secs);
        self.display.on_stats_changed(self.stats.completed_work_cycles, &focus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::rc::Rc;

    #[derive(Default)]
    struct Updates(Vec<DisplayUpdate>);

    impl DisplaySink for Updates {
        fn on_update(&mut self, update: &DisplayUpdate) {
            self.0.push(update.clone());
        }

        fn on_stats_changed(&mut self, _completed: u32, _total_focus: &str) {}
    }

    #[derive(Default)]
    struct Count(usize);

    impl NotificationSink for Count {
        fn notify_completion(&mut self, _completion: Completion) {
            self.0 += 1;
        }
    }

    fn engine() -> (TimerEngine<Updates, Count>, ManualClock) {
        let kv: Rc<MemoryStore> = Rc::new(MemoryStore::new());
        let clock = ManualClock::new(1_700_000_000_000);
        let engine = TimerEngine::new(
            SettingsStore::new(kv.clone()),
            StatsStore::new(kv),
            Box::new(clock.clone()),
            Updates::default(),
            Count::default(),
        );
        (engine, clock)
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("Pomodoro".parse::<TimerMode>(), Ok(TimerMode::Pomodoro));
        assert_eq!("stopwatch".parse::<TimerMode>(), Ok(TimerMode::Stopwatch));
        assert_eq!("timer".parse::<TimerMode>(), Ok(TimerMode::Countdown));
        assert!("lap".parse::<TimerMode>().is_err());
        for mode in TimerMode::ALL {
            assert_eq!(mode.to_string().parse::<TimerMode>(), Ok(mode));
        }
    }

    #[test]
    fn starts_idle_in_pomodoro() {
        let (engine, _) = engine();
        let state = engine.state();
        assert_eq!(state.mode, TimerMode::Pomodoro);
        assert!(state.is_idle());
        assert_eq!(state.remaining_secs, 1500);
        assert_eq!(engine.snapshot().display, "25:00");
        assert_eq!(engine.snapshot().status, "Ready to focus");
        assert_eq!(engine.snapshot().progress, 1.0);
    }

    #[test]
    fn countdown_ticks_once_per_second() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(999);
        engine.poll();
        assert_eq!(engine.state().remaining_secs, 1500);

        clock.advance(1);
        engine.poll();
        assert_eq!(engine.state().remaining_secs, 1499);

        clock.advance(3_000);
        engine.poll();
        assert_eq!(engine.state().remaining_secs, 1496);
        assert_eq!(engine.display().0.last().unwrap().display, "24:56");
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(2_500);
        engine.poll();
        engine.pause();
        assert_eq!(engine.state().remaining_secs, 1498);
        assert!(engine.state().paused);
        assert_eq!(engine.next_deadline(), None);

        clock.advance(10_000);
        engine.poll();
        assert_eq!(engine.state().remaining_secs, 1498);

        engine.start();
        clock.advance(1_000);
        engine.poll();
        assert_eq!(engine.state().remaining_secs, 1497);
    }

    #[test]
    fn start_is_noop_while_running() {
        let (mut engine, clock) = engine();
        engine.start();
        let deadline = engine.next_deadline();
        clock.advance(400);
        engine.start();
        assert_eq!(engine.next_deadline(), deadline);
    }

    #[test]
    fn toggle_alternates() {
        let (mut engine, _) = engine();
        engine.toggle();
        assert!(engine.state().running);
        engine.toggle();
        assert!(engine.state().paused);
        engine.toggle();
        assert!(engine.state().running);
    }

    #[test]
    fn countdown_without_duration_cannot_start() {
        let (mut engine, _) = engine();
        engine.set_mode(TimerMode::Countdown);
        assert_eq!(engine.state().remaining_secs, 0);
        engine.start();
        assert!(!engine.state().running);
        assert_eq!(engine.snapshot().status, "Set a countdown");
        assert_eq!(engine.snapshot().progress, 0.0);
    }

    #[test]
    fn countdown_duration_outside_countdown_mode_is_kept_for_later() {
        let (mut engine, _) = engine();
        engine.set_countdown_duration(0, 10, 0);
        assert_eq!(engine.state().remaining_secs, 1500);
        engine.set_mode(TimerMode::Countdown);
        assert_eq!(engine.state().remaining_secs, 600);
    }

    #[test]
    fn countdown_duration_overflow_is_ignored() {
        let (mut engine, _) = engine();
        engine.set_mode(TimerMode::Countdown);
        engine.set_countdown_duration(i64::MAX, 1, 0);
        assert_eq!(engine.state().remaining_secs, 0);
        engine.set_countdown_duration(0, 1, -61);
        assert_eq!(engine.state().remaining_secs, 0);
    }

    #[test]
    fn break_duration_updates_shown_break() {
        let (mut engine, _) = engine();
        engine.set_break_duration(10);
        // work phase is shown, so remaining stays
        assert_eq!(engine.state().remaining_secs, 1500);
        assert_eq!(engine.state().break_duration_secs, 600);
    }

    #[test]
    fn work_duration_does_not_touch_paused_timer() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(1_000);
        engine.poll();
        engine.pause();
        engine.set_work_duration(30);
        assert_eq!(engine.state().work_duration_secs, 1800);
        assert_eq!(engine.state().remaining_secs, 1499);
    }

    #[test]
    fn work_duration_does_not_touch_other_modes() {
        let (mut engine, _) = engine();
        engine.set_mode(TimerMode::Stopwatch);
        engine.set_work_duration(30);
        assert_eq!(engine.state().remaining_secs, 1500);
        engine.set_mode(TimerMode::Pomodoro);
        assert_eq!(engine.state().remaining_secs, 1800);
    }

    #[test]
    fn finished_countdown_notifies_once() {
        let (mut engine, clock) = engine();
        engine.set_mode(TimerMode::Countdown);
        engine.set_countdown_duration(0, 0, 2);
        engine.start();
        clock.advance(5_000);
        engine.poll();
        assert_eq!(engine.notifier().0, 1);
        assert!(engine.state().countdown_finished);

        engine.reset();
        assert!(!engine.state().countdown_finished);
        assert_eq!(engine.snapshot().status, "Set a countdown");
    }

    #[test]
    fn stopwatch_progress_cycles_every_minute() {
        let mut state = TimerState::from_settings(&Settings::default());
        state.mode = TimerMode::Stopwatch;
        state.elapsed_secs = 90;
        assert_eq!(state.progress(), 0.5);
        state.elapsed_secs = 120;
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn pomodoro_progress_is_clamped() {
        let mut state = TimerState::from_settings(&Settings::default());
        state.remaining_secs = 3000;
        assert_eq!(state.progress(), 1.0);
        state.remaining_secs = 750;
        assert_eq!(state.progress(), 0.5);
    }

    #[test]
    fn schedule_picks_earliest_due_task() {
        let schedule = Schedule {
            next_tick: Some(2_000),
            auto_start: Some(1_000),
        };
        assert_eq!(schedule.due(500), None);
        assert_eq!(schedule.due(1_500), Some(Task::AutoStart(1_000)));
        assert_eq!(schedule.due(2_000), Some(Task::AutoStart(1_000)));
        assert_eq!(schedule.earliest(), Some(1_000));

        let tied = Schedule {
            next_tick: Some(1_000),
            auto_start: Some(1_000),
        };
        assert_eq!(tied.due(1_000), Some(Task::Tick(1_000)));
    }
}
