use ratatui::{prelude::*, widgets::*};
use tritimer::TimerMode;
use tritimer::format::format_focus;

use crate::app::{App, SettingsField, View};

// ============================================================================
// Themes
// ============================================================================

/// Selectable background ids and the tint each one gives the interface.
pub const BACKGROUNDS: &[(&str, Color)] = &[
    ("default", Color::Rgb(0, 200, 255)),
    ("yellow-light", Color::Rgb(0xFF, 0xF8, 0xE6)),
    ("yellow", Color::Rgb(0xFF, 0xF3, 0xCD)),
    ("yellow-dark", Color::Rgb(0xFF, 0xE5, 0xB4)),
    ("red-light", Color::Rgb(0xFF, 0xE5, 0xE5)),
    ("red", Color::Rgb(0xFF, 0xCD, 0xD2)),
    ("blue-light", Color::Rgb(0xE6, 0xF7, 0xFF)),
    ("blue", Color::Rgb(0xBB, 0xDE, 0xFB)),
    ("blue-dark", Color::Rgb(0x90, 0xCA, 0xF9)),
    ("green-light", Color::Rgb(0xE6, 0xFF, 0xEE)),
    ("green", Color::Rgb(0xC8, 0xE6, 0xC9)),
    ("purple-light", Color::Rgb(0xF0, 0xF0, 0xFF)),
    ("purple", Color::Rgb(0xE1, 0xBE, 0xE7)),
    ("pink-light", Color::Rgb(0xFF, 0xEB, 0xEE)),
    ("pink", Color::Rgb(0xFC, 0xE4, 0xEC)),
    ("gray-light", Color::Rgb(0xF5, 0xF5, 0xF5)),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub work_color: Color,
    pub break_color: Color,
    pub border_color: Color,
    pub accent_color: Color,
}

pub fn get_theme(background: &str) -> Theme {
    let tint = BACKGROUNDS
        .iter()
        .find(|(id, _)| *id == background)
        .map(|(_, color)| *color);

    match tint {
        Some(tint) if background != "default" => Theme {
            work_color: Color::Rgb(100, 181, 246),
            break_color: Color::Rgb(0, 255, 150),
            border_color: tint,
            accent_color: tint,
        },
        _ => Theme {
            work_color: Color::Rgb(100, 181, 246),
            break_color: Color::Rgb(0, 255, 150),
            border_color: Color::Rgb(0, 200, 255),
            accent_color: Color::Rgb(255, 100, 0),
        },
    }
}

fn phase_name(app: &App) -> &'static str {
    let state = app.engine.state();
    match state.mode {
        TimerMode::Pomodoro if state.is_break_phase => "☕ BREAK",
        TimerMode::Pomodoro => "🎯 FOCUS",
        TimerMode::Stopwatch => "⏱  STOPWATCH",
        TimerMode::Countdown => "⏳ COUNTDOWN",
    }
}

fn phase_color(app: &App, theme: &Theme) -> Color {
    let state = app.engine.state();
    match state.mode {
        TimerMode::Pomodoro if state.is_break_phase => theme.break_color,
        TimerMode::Pomodoro => theme.work_color,
        _ => theme.accent_color,
    }
}

// ============================================================================
// UI Rendering
// ============================================================================

pub fn render_ui(f: &mut Frame, app: &App) {
    let theme = get_theme(&app.engine.settings().background);
    match app.view {
        View::Timer => render_timer(f, app, &theme),
        View::Help => render_help(f, &theme),
        View::Settings => render_settings(f, app, &theme),
    }
}

fn render_timer(f: &mut Frame, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    // Header with mode tabs
    let selected = TimerMode::ALL
        .iter()
        .position(|m| *m == app.engine.state().mode)
        .unwrap_or(0);
    let tabs = Tabs::new(TimerMode::ALL.iter().map(|m| m.title()).collect::<Vec<_>>())
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))
        .divider("•")
        .block(Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.border_color))
            .title(Span::styled(" 🍅 TRITIMER ", Style::default()
                .fg(theme.accent_color).add_modifier(Modifier::BOLD))));
    f.render_widget(tabs, chunks[0]);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(3), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(3), Constraint::Length(1),
            Constraint::Length(1), Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Percentage(10),
        ])
        .split(chunks[1]);

    let color = phase_color(app, theme);
    let display = app.engine.display();
    let (time_str, progress, status) = match &display.update {
        Some(u) => (u.display.clone(), u.progress, u.status.clone()),
        None => {
            let u = app.engine.snapshot();
            (u.display, u.progress, u.status)
        }
    };

    f.render_widget(
        Paragraph::new(phase_name(app))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[1]
    );

    f.render_widget(
        Paragraph::new(vec![Line::from(""), Line::from(time_str)])
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[3]
    );

    let state = app.engine.state();
    let status_color = if state.running {
        Color::Green
    } else if state.paused {
        Color::Yellow
    } else {
        Color::Gray
    };
    f.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(status_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        sections[5]
    );

    f.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded))
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio(progress.clamp(0.0, 1.0)),
        sections[7]
    );

    let stats_text = format!(
        "{} pomodoros today  •  {} focused",
        display.completed_today,
        if display.focus_today.is_empty() {
            format_focus(app.engine.stats().total_focus_secs)
        } else {
            display.focus_today.clone()
        }
    );
    f.render_widget(
        Paragraph::new(stats_text).style(Style::default().fg(Color::Gray)).alignment(Alignment::Center),
        sections[9]
    );

    // Countdown entry or last notice
    let prompt = if app.countdown_editing {
        Line::from(vec![
            Span::styled("Countdown (e.g. 1h30m, 25:00): ", Style::default().fg(Color::Yellow)),
            Span::styled(app.input.as_str(), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("█", Style::default().fg(Color::Green)),
        ])
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Red)))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(prompt).alignment(Alignment::Center), sections[11]);

    let mut first = vec![
        span_key("Space", theme), Span::raw(" Start/Pause  •  "),
        span_key("R", theme), Span::raw(" Reset  •  "),
        span_key("1-3", theme), Span::raw(" Mode"),
    ];
    if state.mode == TimerMode::Countdown {
        first.push(Span::raw("  •  "));
        first.push(span_key("E", theme));
        first.push(Span::raw(" Set"));
    }
    let controls = vec![
        Line::from(first),
        Line::from(vec![
            span_key("D", theme), Span::raw(" Settings  •  "),
            span_key("H", theme), Span::raw(" Help  •  "),
            span_key("Q", theme), Span::raw(" Quit"),
        ]),
    ];
    f.render_widget(
        Paragraph::new(controls).alignment(Alignment::Center).style(Style::default().fg(Color::DarkGray)),
        chunks[2]
    );
}

fn span_key<'a>(text: &'a str, theme: &Theme) -> Span<'a> {
    Span::styled(text, Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))
}

fn render_help(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(70, 85, f.size());

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("⌨️  KEYBOARD SHORTCUTS", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("  Timer Controls:"),
        help_line("Space", "Start / pause"),
        help_line("R / Ctrl+R", "Reset current timer"),
        help_line("E", "Set countdown length (countdown mode)"),
        Line::from(""),
        Line::from("  Modes:"),
        help_line("1 / P", "Pomodoro"),
        help_line("2 / W", "Stopwatch"),
        help_line("3 / C", "Countdown"),
        Line::from(""),
        Line::from("  Navigation:"),
        help_line("D", "Open settings"),
        help_line("H / ?", "Toggle help"),
        help_line("Q / Esc", "Back / quit"),
        help_line("Ctrl+C", "Force quit"),
        Line::from(""),
        Line::from(Span::styled("💡 Settings and today's stats are saved automatically",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
    ];

    f.render_widget(
        Paragraph::new(help_text)
            .alignment(Alignment::Left)
            .block(Block::default()
                .title(" Help ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color))),
        area
    );
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("    "),
        Span::styled(key, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", desc)),
    ])
}

fn on_off(enabled: bool) -> String {
    let label = if enabled { "ON" } else { "OFF" };
    label.into()
}

fn render_settings(f: &mut Frame, app: &App, theme: &Theme) {
    let area = centered_rect(70, 85, f.size());
    let state = app.engine.state();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("⚙️  SETTINGS", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled("  ↑↓/jk: Navigate  •  Enter: Edit  •  Space: Toggle  •  ←→/hl: Background",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))),
    ];

    for field in SettingsField::ALL {
        let (label, value) = match field {
            SettingsField::WorkDuration => ("🎯 Work Duration", format!("{} min", state.work_duration_secs / 60)),
            SettingsField::BreakDuration => ("☕ Break Duration", format!("{} min", state.break_duration_secs / 60)),
            SettingsField::AutoStartBreak => ("▶️  Auto-Start Break", on_off(state.auto_start_break)),
            SettingsField::AutoStartNextWork => ("🔁 Auto-Start Next Pomodoro", on_off(state.auto_start_next_work)),
            SettingsField::Background => ("🎨 Background", format!("< {} >", app.engine.settings().background)),
        };
        let selected = app.settings_field == field;
        let editing = selected && app.settings_editing;

        lines.push(Line::from(""));

        if editing {
            lines.push(Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled(label, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(app.input.as_str(), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::styled("█", Style::default().fg(Color::Green)),
            ]));
        } else {
            let (prefix, label_style, value_style) = if selected {
                ("  > ", Style::default().fg(theme.accent_color).add_modifier(Modifier::BOLD),
                 Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
            } else {
                ("    ", Style::default().fg(Color::Gray), Style::default().fg(Color::DarkGray))
            };

            lines.push(Line::from(vec![Span::styled(prefix, label_style), Span::styled(label, label_style)]));
            lines.push(Line::from(vec![Span::raw("    "), Span::styled(value, value_style)]));
        }
    }

    lines.push(Line::from(""));
    match &app.notice {
        Some(notice) => lines.push(Line::from(Span::styled(format!("  {}", notice), Style::default().fg(Color::Red)))),
        None => lines.push(Line::from(Span::styled("  💾 Auto-saved", Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC)))),
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default()
                .title(" Settings ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border_color))),
        area
    );
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}
