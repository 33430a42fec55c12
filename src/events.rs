//! Interfaces between the engine and whatever shows or announces its state.

/// What the engine wants on screen after a state change.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayUpdate {
    /// `MM:SS` or `HH:MM:SS`.
    pub display: String,
    /// Fraction in `0.0..=1.0` for a progress indicator.
    pub progress: f64,
    pub status: String,
}

/// Which countdown just reached zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    WorkFinished,
    BreakFinished,
    CountdownFinished,
}

pub trait DisplaySink {
    fn on_update(&mut self, update: &DisplayUpdate);

    /// `total_focus` is formatted as `HH:MM`.
    fn on_stats_changed(&mut self, completed: u32, total_focus: &str);
}

/// Completion signal. Implementations deal with their own failures; nothing
/// is reported back to the engine.
pub trait NotificationSink {
    fn notify_completion(&mut self, completion: Completion);
}
