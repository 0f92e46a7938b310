mod clipboard;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::model::{AppEvent, DisplayModel, ExportFormat, Severity, UiCommand};
use crate::notify::ChannelSink;
use crate::orchestrator::{self, Workflow};
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};
use state::{Focus, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = build_config(&args);
    let transport = Arc::new(
        HttpTransport::new(&cfg.base_url, &cfg.user_agent).context("create http transport")?,
    );
    let sink = Arc::new(ChannelSink::new(event_tx.clone()));
    let workflow = Arc::new(Workflow::new(&cfg, transport, sink));

    let mut initial = UiState {
        base_url: cfg.base_url.clone(),
        download_dir: workflow.download_dir().to_path_buf(),
        ..Default::default()
    };
    if let Some(url) = args.repo_url.as_deref() {
        initial.set_input(url);
        let _ = cmd_tx.send(UiCommand::Analyze(url.to_string()));
    }

    // Terminal I/O stays on its own thread; the runtime only sees channel traffic.
    let ui_handle = std::thread::spawn(move || run_threaded(initial, event_rx, cmd_tx));

    let res = orchestrator::run_session(workflow, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// What a key press asks the UI loop to do.
#[derive(Debug, PartialEq)]
enum Action {
    Nothing,
    Send(UiCommand),
    CopyExportedPath,
    Quit,
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
            dirty = true;
        }

        // Redraw on the tick while busy so the spinner moves.
        if dirty || (state.busy && last_tick.elapsed() >= tick_rate) {
            terminal.draw(|f| draw(f.area(), f, &mut state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => {
                    dirty = true;
                    match handle_key(&mut state, k) {
                        Action::Nothing => {}
                        Action::Send(cmd) => {
                            if cmd_tx.send(cmd).is_err() {
                                break Err(anyhow::anyhow!("session loop stopped"));
                            }
                        }
                        Action::CopyExportedPath => copy_exported_path(&mut state),
                        Action::Quit => {
                            let _ = cmd_tx.send(UiCommand::Quit);
                            break Ok(());
                        }
                    }
                }
                Ok(Event::Resize(..)) => dirty = true,
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn copy_exported_path(state: &mut UiState) {
    let Some(path) = state.last_exported_path.as_ref() else {
        state.info = "Nothing exported yet".into();
        return;
    };
    let text = path.display().to_string();
    state.info = match clipboard::copy_to_clipboard(&text) {
        Ok(()) => format!("Copied: {text}"),
        Err(e) => format!("Copy failed: {e:#}"),
    };
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> Action {
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if state.show_help {
        state.show_help = false;
        return Action::Nothing;
    }

    match k.code {
        KeyCode::Esc => {
            if state.busy {
                return Action::Send(UiCommand::Cancel);
            }
            state.focus = Focus::Report;
            return Action::Nothing;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.focus = match state.focus {
                Focus::Input => Focus::Report,
                Focus::Report => Focus::Input,
            };
            return Action::Nothing;
        }
        _ => {}
    }

    match state.focus {
        Focus::Input => input_key(state, k),
        Focus::Report => report_key(state, k),
    }
}

fn input_key(state: &mut UiState, k: KeyEvent) -> Action {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Enter => return Action::Send(UiCommand::Analyze(state.input.clone())),
        KeyCode::Char('u') if ctrl => state.clear_input(),
        KeyCode::Char('a') if ctrl => state.cursor_home(),
        KeyCode::Char('e') if ctrl => state.cursor_end(),
        KeyCode::Char(c) if !ctrl => state.insert_char(c),
        KeyCode::Backspace => state.backspace(),
        KeyCode::Delete => state.delete(),
        KeyCode::Left => state.move_cursor(-1),
        KeyCode::Right => state.move_cursor(1),
        KeyCode::Home => state.cursor_home(),
        KeyCode::End => state.cursor_end(),
        _ => {}
    }
    Action::Nothing
}

fn report_key(state: &mut UiState, k: KeyEvent) -> Action {
    match k.code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('p') => return Action::Send(UiCommand::Export(ExportFormat::Pdf)),
        KeyCode::Char('w') => return Action::Send(UiCommand::Export(ExportFormat::Word)),
        KeyCode::Char('m') => return Action::Send(UiCommand::Export(ExportFormat::Markdown)),
        KeyCode::Char('y') => return Action::CopyExportedPath,
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Char('i') | KeyCode::Enter => state.focus = Focus::Input,
        KeyCode::Up | KeyCode::Char('k') => state.scroll_by(-1),
        KeyCode::Down | KeyCode::Char('j') => state.scroll_by(1),
        KeyCode::PageUp => state.scroll_by(-10),
        KeyCode::PageDown => state.scroll_by(10),
        KeyCode::Char('g') | KeyCode::Home => state.report_scroll = 0,
        KeyCode::Char('G') | KeyCode::End => state.report_scroll = u16::MAX,
        _ => {}
    }
    Action::Nothing
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            " repo-analyst ",
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(state.base_url.clone(), Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(title), chunks[0]);

    draw_input(chunks[1], f, state);
    draw_report(chunks[2], f, state);
    draw_footer(chunks[3], f, state);

    if state.notice.is_some() {
        draw_notice(area, f, state);
    }
    if state.show_help {
        help::draw_help(centered(area, 60, 24), f);
    }
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let focused = state.focus == Focus::Input && !state.show_help;
    let title = if state.busy {
        let frame = state
            .busy_since
            .map(|t| (t.elapsed().as_millis() / 100) as usize % SPINNER.len())
            .unwrap_or(0);
        format!("GitHub repository {} {}", SPINNER[frame], state.loading)
    } else {
        "GitHub repository".to_string()
    };

    let body = if state.input.is_empty() && !focused {
        Line::from(Span::styled(
            "https://github.com/<owner>/<repository>",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(state.input.as_str())
    };

    // Keep the cursor visible on long links.
    let usable = area.width.saturating_sub(2) as usize;
    let offset = state.cursor.saturating_sub(usable.saturating_sub(1));

    let p = Paragraph::new(body).scroll((0, offset as u16)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused))
            .title(title),
    );
    f.render_widget(p, area);

    if focused {
        let x = area.x + 1 + (state.cursor - offset) as u16;
        f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn draw_report(area: Rect, f: &mut ratatui::Frame, state: &mut UiState) {
    let focused = state.focus == Focus::Report && !state.show_help;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title("Report");

    let lines = match state.report.as_ref() {
        Some(model) => report_lines(model, area.width.saturating_sub(2)),
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "Enter a repository link and press Enter to analyze it.",
                Style::default().fg(Color::Gray),
            )),
        ],
    };

    let visible = area.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible).min(u16::MAX as usize) as u16;
    state.report_scroll = state.report_scroll.min(max_scroll);

    let p = Paragraph::new(lines)
        .scroll((state.report_scroll, 0))
        .block(block);
    f.render_widget(p, area);
}

fn report_lines(model: &DisplayModel, width: u16) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Gray);
    let mut out = vec![
        Line::from(Span::styled(
            model.full_name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    for part in wrap_text(&model.description, width) {
        out.push(Line::from(Span::styled(
            part,
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    out.push(Line::from(""));
    out.push(Line::from(vec![
        Span::styled("★ ", Style::default().fg(Color::Yellow)),
        Span::raw(model.stars.clone()),
        Span::styled("   forks ", label),
        Span::raw(model.forks.clone()),
        Span::styled("   open issues ", label),
        Span::raw(model.open_issues.clone()),
        Span::styled("   language ", label),
        Span::styled(model.language.clone(), Style::default().fg(Color::Green)),
    ]));
    out.push(Line::from(vec![
        Span::styled("created ", label),
        Span::raw(model.created_at.clone()),
        Span::styled("   updated ", label),
        Span::raw(model.updated_at.clone()),
    ]));
    let mut analyzed = vec![
        Span::styled("analyzed ", label),
        Span::raw(model.analyzed_at.clone()),
    ];
    if let Some(t) = model.processing_time.as_ref() {
        analyzed.push(Span::styled("   took ", label));
        analyzed.push(Span::raw(t.clone()));
    }
    out.push(Line::from(analyzed));
    out.push(Line::from(""));
    out.push(Line::from(Span::styled(
        "AI analysis",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )));
    for raw in model.analysis.lines() {
        if raw.trim().is_empty() {
            out.push(Line::from(""));
            continue;
        }
        for part in wrap_text(raw, width) {
            out.push(Line::from(part));
        }
    }
    out
}

/// Greedy word wrap on char counts; words longer than `width` are split.
fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = width.max(1) as usize;
    let mut out = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > width {
            if line_len > 0 {
                out.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let rest = chars.split_off(width);
            out.push(chars.into_iter().collect());
            chars = rest;
        }
        let len = chars.len();
        if line_len > 0 && line_len + 1 + len > width {
            out.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(chars);
        line_len += len;
    }
    if line_len > 0 || out.is_empty() {
        out.push(line);
    }
    out
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hints = match state.focus {
        Focus::Input => "Enter analyze  Esc cancel  Tab report  ? help  Ctrl-C quit",
        Focus::Report => "p/w/m export  y copy path  Tab edit  ? help  q quit",
    };
    let status = if state.info.is_empty() {
        format!("Exports: {}", state.download_dir.display())
    } else {
        state.info.clone()
    };
    let line = Line::from(vec![
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(status, Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
    }
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(notice) = state.notice.as_ref() else {
        return;
    };
    let color = severity_color(notice.severity);
    let stamp = notice
        .shown_at
        .format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();

    let max_width = area.width.saturating_sub(2).min(60);
    let lines: Vec<Line> = wrap_text(&notice.message, max_width.saturating_sub(2))
        .into_iter()
        .map(Line::from)
        .collect();
    let longest = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let title = format!(" {} {stamp} ", notice.severity.label());
    let width = (longest.max(title.chars().count() as u16) + 2).min(max_width);
    let height = (lines.len() as u16 + 2).min(area.height);

    let rect = Rect {
        x: area.right().saturating_sub(width + 1),
        y: area.y + 1,
        width,
        height,
    }
    .intersection(area);
    // Too small for a border around any text.
    if rect.width < 3 || rect.height < 3 {
        return;
    }
    let p = Paragraph::new(lines).style(Style::default().fg(color)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
