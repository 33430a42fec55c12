//! Desktop notification and audible signal for finished phases.

use notify_rust::{Notification, Urgency};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::events::{Completion, NotificationSink};

const BEEP_COUNT: usize = 3;
const BEEP_GAP: Duration = Duration::from_millis(300);

/// Sound players tried in order; the first whose sample exists is used.
const SOUND_PLAYERS: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
];

pub struct DesktopNotifier {
    desktop: bool,
    sound: bool,
}

impl DesktopNotifier {
    pub fn new(desktop: bool, sound: bool) -> Self {
        Self { desktop, sound }
    }
}

pub fn message(completion: Completion) -> (&'static str, &'static str) {
    match completion {
        Completion::WorkFinished => ("Break Time! ☕", "Focus session complete. Time for a break."),
        Completion::BreakFinished => ("Back to Work! 🎯", "Break is over. Ready for the next session."),
        Completion::CountdownFinished => ("Time's Up! ⏰", "Your countdown has finished."),
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify_completion(&mut self, completion: Completion) {
        if self.desktop {
            let (title, body) = message(completion);
            let shown = Notification::new()
                .summary(title)
                .body(body)
                .appname("tritimer")
                .icon("alarm-clock")
                .urgency(Urgency::Critical)
                .show();
            if let Err(e) = shown {
                warn!(error = %e, "desktop notification failed");
            }
        }

        if self.sound {
            thread::spawn(play_beeps);
        }
    }
}

fn play_beeps() {
    let player = SOUND_PLAYERS
        .iter()
        .find(|(_, file)| Path::new(file).exists());

    for i in 0..BEEP_COUNT {
        if i > 0 {
            thread::sleep(BEEP_GAP);
        }
        let played = match player {
            Some((cmd, file)) => Command::new(cmd)
                .arg(file)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .is_ok(),
            None => false,
        };
        if !played {
            terminal_bell();
        }
    }
    debug!(player = ?player.map(|(cmd, _)| cmd), "completion sound played");
}

fn terminal_bell() {
    let mut out = std::io::stdout();
    if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
        warn!(error = %e, "terminal bell failed");
    }
}
