use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tritimer::format::{parse_duration, split_hms};
use tritimer::notify::DesktopNotifier;
use tritimer::settings::phase_minutes_valid;
use tritimer::{DisplaySink, DisplayUpdate, TimerEngine, TimerMode};

use crate::ui::BACKGROUNDS;

pub type Engine = TimerEngine<TerminalDisplay, DesktopNotifier>;

// ============================================================================
// Display Adapter
// ============================================================================

/// Latest picture reported by the engine, read by the renderer.
#[derive(Default)]
pub struct TerminalDisplay {
    pub update: Option<DisplayUpdate>,
    pub completed_today: u32,
    pub focus_today: String,
}

impl DisplaySink for TerminalDisplay {
    fn on_update(&mut self, update: &DisplayUpdate) {
        self.update = Some(update.clone());
    }

    fn on_stats_changed(&mut self, completed: u32, total_focus: &str) {
        self.completed_today = completed;
        self.focus_today = total_focus.to_string();
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum View {
    Timer,
    Help,
    Settings,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SettingsField {
    WorkDuration,
    BreakDuration,
    AutoStartBreak,
    AutoStartNextWork,
    Background,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        Self::WorkDuration,
        Self::BreakDuration,
        Self::AutoStartBreak,
        Self::AutoStartNextWork,
        Self::Background,
    ];

    fn next(self) -> Self {
        match self {
            Self::WorkDuration => Self::BreakDuration,
            Self::BreakDuration => Self::AutoStartBreak,
            Self::AutoStartBreak => Self::AutoStartNextWork,
            Self::AutoStartNextWork => Self::Background,
            Self::Background => Self::WorkDuration,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::WorkDuration => Self::Background,
            Self::BreakDuration => Self::WorkDuration,
            Self::AutoStartBreak => Self::BreakDuration,
            Self::AutoStartNextWork => Self::AutoStartBreak,
            Self::Background => Self::AutoStartNextWork,
        }
    }
}

pub struct App {
    pub engine: Engine,
    pub view: View,
    pub settings_field: SettingsField,
    pub settings_editing: bool,
    pub countdown_editing: bool,
    pub input: String,
    pub notice: Option<String>,
}

impl App {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            view: View::Timer,
            settings_field: SettingsField::WorkDuration,
            settings_editing: false,
            countdown_editing: false,
            input: String::new(),
            notice: None,
        }
    }

    fn editing(&self) -> bool {
        self.settings_editing || self.countdown_editing
    }

    fn stop_editing(&mut self) {
        self.settings_editing = false;
        self.countdown_editing = false;
        self.input.clear();
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Apply one key press. Returns true when the app should quit.
pub fn handle_input(key: KeyEvent, app: &mut App) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if app.editing() {
        match key.code {
            KeyCode::Char(c) => app.input.push(c),
            KeyCode::Backspace => { app.input.pop(); }
            KeyCode::Enter => {
                if app.countdown_editing {
                    apply_countdown(app);
                } else {
                    apply_setting(app);
                }
                app.stop_editing();
            }
            KeyCode::Esc => app.stop_editing(),
            _ => {}
        }
        return false;
    }

    match app.view {
        View::Settings => handle_settings_view(key, app),
        _ => handle_main_view(key, app),
    }
}

fn handle_main_view(key: KeyEvent, app: &mut App) -> bool {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.engine.reset();
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            if app.view == View::Timer {
                return true;
            }
            app.view = View::Timer;
        }
        KeyCode::Char(' ') => app.engine.toggle(),
        KeyCode::Char('r') => app.engine.reset(),
        KeyCode::Char('1') | KeyCode::Char('p') => select_mode(app, TimerMode::Pomodoro),
        KeyCode::Char('2') | KeyCode::Char('w') => select_mode(app, TimerMode::Stopwatch),
        KeyCode::Char('3') | KeyCode::Char('c') => select_mode(app, TimerMode::Countdown),
        KeyCode::Char('e') => {
            if app.engine.state().mode == TimerMode::Countdown {
                app.countdown_editing = true;
                app.input.clear();
                app.notice = None;
            }
        }
        KeyCode::Char('d') => app.view = View::Settings,
        KeyCode::Char('h') | KeyCode::Char('?') => {
            app.view = if app.view == View::Help { View::Timer } else { View::Help };
        }
        _ => {}
    }
    false
}

fn handle_settings_view(key: KeyEvent, app: &mut App) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('d') => app.view = View::Timer,
        KeyCode::Down | KeyCode::Char('j') => app.settings_field = app.settings_field.next(),
        KeyCode::Up | KeyCode::Char('k') => app.settings_field = app.settings_field.prev(),
        KeyCode::Enter | KeyCode::Char('e') => start_editing(app),
        KeyCode::Char(' ') => match app.settings_field {
            SettingsField::AutoStartBreak => {
                let enabled = !app.engine.state().auto_start_break;
                app.engine.set_auto_start_break(enabled);
            }
            SettingsField::AutoStartNextWork => {
                let enabled = !app.engine.state().auto_start_next_work;
                app.engine.set_auto_start_next_work(enabled);
            }
            _ => {}
        },
        KeyCode::Left | KeyCode::Char('h') => {
            if app.settings_field == SettingsField::Background {
                cycle_background(app, false);
            }
        }
        KeyCode::Right | KeyCode::Char('l') => {
            if app.settings_field == SettingsField::Background {
                cycle_background(app, true);
            }
        }
        _ => {}
    }
    false
}

fn select_mode(app: &mut App, mode: TimerMode) {
    app.notice = None;
    app.engine.set_mode(mode);
}

fn start_editing(app: &mut App) {
    let state = app.engine.state();
    let input = match app.settings_field {
        SettingsField::WorkDuration => state.work_duration_secs / 60,
        SettingsField::BreakDuration => state.break_duration_secs / 60,
        _ => return,
    };

    app.input = input.to_string();
    app.settings_editing = true;
    app.notice = None;
}

fn apply_setting(app: &mut App) {
    let Ok(minutes) = app.input.trim().parse::<i64>() else {
        app.notice = Some("Enter a whole number of minutes".into());
        return;
    };
    if !phase_minutes_valid(minutes) {
        app.notice = Some("Durations must be between 1 and 60 minutes".into());
        return;
    }

    match app.settings_field {
        SettingsField::WorkDuration => app.engine.set_work_duration(minutes),
        SettingsField::BreakDuration => app.engine.set_break_duration(minutes),
        _ => {}
    }
}

fn apply_countdown(app: &mut App) {
    match parse_duration(&app.input) {
        Ok(total) => {
            let (h, m, s) = split_hms(total);
            app.engine.set_countdown_duration(h as i64, m as i64, s as i64);
            app.notice = None;
        }
        Err(e) => app.notice = Some(e),
    }
}

fn cycle_background(app: &mut App, forward: bool) {
    let current = &app.engine.settings().background;
    let idx = BACKGROUNDS.iter().position(|(id, _)| id == current).unwrap_or(0);
    let new_idx = if forward {
        (idx + 1) % BACKGROUNDS.len()
    } else if idx == 0 {
        BACKGROUNDS.len() - 1
    } else {
        idx - 1
    };

    app.engine.set_background(BACKGROUNDS[new_idx].0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tritimer::{ManualClock, MemoryStore, SettingsStore, StatsStore};

    fn app() -> App {
        let kv = Rc::new(MemoryStore::new());
        let mut engine = TimerEngine::new(
            SettingsStore::new(kv.clone()),
            StatsStore::new(kv),
            Box::new(ManualClock::new(1_700_000_000_000)),
            TerminalDisplay::default(),
            DesktopNotifier::new(false, false),
        );
        engine.refresh();
        App::new(engine)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_input(key(KeyCode::Char(c)), app);
        }
    }

    #[test]
    fn space_toggles_timer() {
        let mut app = app();
        handle_input(key(KeyCode::Char(' ')), &mut app);
        assert!(app.engine.state().running);
        handle_input(key(KeyCode::Char(' ')), &mut app);
        assert!(app.engine.state().paused);
    }

    #[test]
    fn ctrl_r_resets() {
        let mut app = app();
        handle_input(key(KeyCode::Char(' ')), &mut app);
        handle_input(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL), &mut app);
        assert!(app.engine.state().is_idle());
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert!(handle_input(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut app));
        assert!(handle_input(key(KeyCode::Char('q')), &mut app));
    }

    #[test]
    fn q_in_help_returns_to_timer() {
        let mut app = app();
        handle_input(key(KeyCode::Char('?')), &mut app);
        assert_eq!(app.view, View::Help);
        assert!(!handle_input(key(KeyCode::Char('q')), &mut app));
        assert_eq!(app.view, View::Timer);
    }

    #[test]
    fn number_keys_switch_modes() {
        let mut app = app();
        handle_input(key(KeyCode::Char('2')), &mut app);
        assert_eq!(app.engine.state().mode, TimerMode::Stopwatch);
        handle_input(key(KeyCode::Char('3')), &mut app);
        assert_eq!(app.engine.state().mode, TimerMode::Countdown);
        handle_input(key(KeyCode::Char('1')), &mut app);
        assert_eq!(app.engine.state().mode, TimerMode::Pomodoro);
    }

    #[test]
    fn countdown_entry_sets_duration() {
        let mut app = app();
        handle_input(key(KeyCode::Char('3')), &mut app);
        handle_input(key(KeyCode::Char('e')), &mut app);
        type_text(&mut app, "1h30m");
        handle_input(key(KeyCode::Enter), &mut app);

        assert!(!app.countdown_editing);
        assert_eq!(app.engine.state().remaining_secs, 5400);
        assert_eq!(app.engine.display().update.as_ref().unwrap().display, "01:30:00");
    }

    #[test]
    fn bad_countdown_entry_shows_notice() {
        let mut app = app();
        handle_input(key(KeyCode::Char('3')), &mut app);
        handle_input(key(KeyCode::Char('e')), &mut app);
        type_text(&mut app, "soon");
        handle_input(key(KeyCode::Enter), &mut app);

        assert_eq!(app.engine.state().remaining_secs, 0);
        assert!(app.notice.is_some());
    }

    #[test]
    fn e_outside_countdown_does_not_edit() {
        let mut app = app();
        handle_input(key(KeyCode::Char('e')), &mut app);
        assert!(!app.countdown_editing);
    }

    #[test]
    fn settings_edit_work_duration() {
        let mut app = app();
        handle_input(key(KeyCode::Char('d')), &mut app);
        assert_eq!(app.view, View::Settings);

        handle_input(key(KeyCode::Enter), &mut app);
        assert_eq!(app.input, "25");
        handle_input(key(KeyCode::Backspace), &mut app);
        handle_input(key(KeyCode::Backspace), &mut app);
        type_text(&mut app, "45");
        handle_input(key(KeyCode::Enter), &mut app);

        assert_eq!(app.engine.state().work_duration_secs, 2700);
        assert_eq!(app.engine.settings().work_duration_secs, 2700);
    }

    #[test]
    fn settings_rejects_out_of_range_minutes() {
        let mut app = app();
        handle_input(key(KeyCode::Char('d')), &mut app);
        handle_input(key(KeyCode::Char('j')), &mut app);
        assert_eq!(app.settings_field, SettingsField::BreakDuration);

        handle_input(key(KeyCode::Enter), &mut app);
        app.input.clear();
        type_text(&mut app, "90");
        handle_input(key(KeyCode::Enter), &mut app);

        assert_eq!(app.engine.state().break_duration_secs, 300);
        assert!(app.notice.is_some());
    }

    #[test]
    fn settings_toggle_auto_start() {
        let mut app = app();
        handle_input(key(KeyCode::Char('d')), &mut app);
        handle_input(key(KeyCode::Down), &mut app);
        handle_input(key(KeyCode::Down), &mut app);
        assert_eq!(app.settings_field, SettingsField::AutoStartBreak);
        handle_input(key(KeyCode::Char(' ')), &mut app);
        assert!(!app.engine.state().auto_start_break);
        assert!(!app.engine.settings().auto_start_break);
    }

    #[test]
    fn background_cycles_both_ways() {
        let mut app = app();
        handle_input(key(KeyCode::Char('d')), &mut app);
        handle_input(key(KeyCode::Up), &mut app);
        assert_eq!(app.settings_field, SettingsField::Background);

        handle_input(key(KeyCode::Right), &mut app);
        assert_eq!(app.engine.settings().background, BACKGROUNDS[1].0);
        handle_input(key(KeyCode::Left), &mut app);
        handle_input(key(KeyCode::Left), &mut app);
        assert_eq!(app.engine.settings().background, BACKGROUNDS[BACKGROUNDS.len() - 1].0);
    }

    #[test]
    fn settings_field_cycle_is_closed() {
        for field in SettingsField::ALL {
            assert_eq!(field.next().prev(), field);
        }
    }
}
