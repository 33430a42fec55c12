mod app;
mod ui;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{fs, io, path::{Path, PathBuf}, rc::Rc, sync::Mutex, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tritimer::format::{format_focus, parse_duration, split_hms};
use tritimer::notify::DesktopNotifier;
use tritimer::{
    Clock, JsonFileStore, KeyValueStore, SettingsStore, StatsStore, SystemClock, TimerEngine,
    TimerMode,
};

use app::{App, TerminalDisplay, handle_input};

// ============================================================================
// Type Aliases & Constants
// ============================================================================

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
const FRAME_RATE: Duration = Duration::from_millis(100);
const LOG_FILE: &str = "tritimer.log";
const LOG_ENV: &str = "TRITIMER_LOG";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone)]
#[command(author, version, about = "🍅 tritimer - Pomodoro, stopwatch and countdown in your terminal")]
struct Args {
    /// Mode to open in: pomodoro, stopwatch or countdown
    #[arg(short, long)]
    mode: Option<TimerMode>,
    /// Work phase length in minutes (1-60)
    #[arg(short, long)]
    work: Option<i64>,
    /// Break phase length in minutes (1-60)
    #[arg(short = 'b', long = "break")]
    rest: Option<i64>,
    /// Countdown length, e.g. 1h30m, 90s or 25:00
    #[arg(short, long, value_parser = parse_duration)]
    countdown: Option<u64>,
    /// Where settings, stats and the log file live
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    no_sound: bool,
    #[arg(long)]
    no_notify: bool,
    /// Print today's stats and exit
    #[arg(long)]
    stats: bool,
}

fn data_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| dirs::data_dir().map(|d| d.join("tritimer")))
        .unwrap_or_else(|| PathBuf::from(".").join("tritimer"))
}

/// The terminal belongs to the UI, so logs go to a file in the data directory.
fn init_logging(dir: &Path) {
    let file = match fs::OpenOptions::new().create(true).append(true).open(dir.join(LOG_FILE)) {
        Ok(file) => file,
        Err(_) => return,
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn print_stats(kv: Rc<dyn KeyValueStore>) {
    let stats = StatsStore::new(kv).load(SystemClock.today());
    println!("📅 {}", stats.date);
    println!("   Pomodoros completed: {}", stats.completed_work_cycles);
    println!("   Focus time:          {}", format_focus(stats.total_focus_secs));
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    let dir = data_dir(args.data_dir.clone());
    let kv: Rc<dyn KeyValueStore> = Rc::new(JsonFileStore::new(&dir)?);
    init_logging(&dir);

    if args.stats {
        print_stats(kv);
        return Ok(());
    }

    let mut engine = TimerEngine::new(
        SettingsStore::new(kv.clone()),
        StatsStore::new(kv),
        Box::new(SystemClock),
        TerminalDisplay::default(),
        DesktopNotifier::new(!args.no_notify, !args.no_sound),
    );

    // CLI overrides
    if let Some(w) = args.work { engine.set_work_duration(w); }
    if let Some(b) = args.rest { engine.set_break_duration(b); }
    if let Some(secs) = args.countdown {
        let (h, m, s) = split_hms(secs);
        engine.set_countdown_duration(h as i64, m as i64, s as i64);
    }
    if let Some(mode) = args.mode { engine.set_mode(mode); }
    engine.refresh();
    info!(dir = %dir.display(), mode = %engine.state().mode, "tritimer started");

    let mut app = App::new(engine);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    info!("tritimer stopped");
    res
}

/// Sleep until the next key press, frame, or engine deadline, whichever is first.
fn poll_timeout(app: &App) -> Duration {
    match app.engine.next_deadline() {
        Some(at) => {
            let wait = (at - SystemClock.now_millis()).max(0) as u64;
            Duration::from_millis(wait).min(FRAME_RATE)
        }
        None => FRAME_RATE,
    }
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render_ui(f, app))?;

        if event::poll(poll_timeout(app))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_input(key, app) {
                    return Ok(());
                }
            }
        }

        app.engine.poll();
    }
}
