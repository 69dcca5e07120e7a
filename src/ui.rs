use crate::{
    controller::Command,
    network::NetworkStatus,
    outcome::Outcome,
    presentation::{
        Affordance,
        LeaderboardView,
        PickReveal,
        Presentation,
        Scoreboard,
        Severity,
    },
};
use chrono::DateTime;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::{
    collections::HashSet,
    io::stdout,
};
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

pub const PUMPKINS: usize = 6;
const MAX_ERRORS: usize = 50;
const STT_DECIMALS: u32 = 18;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Command(Command),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

/// Everything the terminal shows, kept up to date by the controller through
/// [`Presentation`].
#[derive(Clone, Debug, Default)]
pub struct ViewModel {
    pub status: String,
    pub severity: Severity,
    pub errors: Vec<String>,
    pub visible: HashSet<Affordance>,
    pub round_visible: bool,
    pub wallet: Option<String>,
    pub network: NetworkStatus,
    pub scoreboard: Scoreboard,
    pub leaderboard: LeaderboardView,
    pub reveal: Option<PickReveal>,
}

impl ViewModel {
    fn push_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    fn shows(&self, affordance: Affordance) -> bool {
        self.visible.contains(&affordance)
    }
}

impl Presentation for ViewModel {
    fn show_status(&mut self, severity: Severity, message: &str) {
        if severity == Severity::Error {
            self.push_error(message);
        }
        self.severity = severity;
        self.status = message.to_string();
    }

    fn set_affordance(&mut self, affordance: Affordance, visible: bool) {
        if visible {
            self.visible.insert(affordance);
        } else {
            self.visible.remove(&affordance);
        }
    }

    fn set_round_visible(&mut self, visible: bool) {
        self.round_visible = visible;
    }

    fn render_wallet(&mut self, short_address: Option<&str>) {
        self.wallet = short_address.map(str::to_string);
    }

    fn render_network(&mut self, status: &NetworkStatus) {
        self.network = status.clone();
    }

    fn render_scoreboard(&mut self, scoreboard: &Scoreboard) {
        self.scoreboard = scoreboard.clone();
    }

    fn render_leaderboard(&mut self, leaderboard: &LeaderboardView) {
        self.leaderboard = leaderboard.clone();
    }

    fn reveal_pick(&mut self, reveal: Option<PickReveal>) {
        self.reveal = reveal;
    }
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Reads terminal events on a dedicated thread; `event::read` blocks.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let ev = event::read();
            let failed = ev.is_err();
            if tx.send(ev).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.recv().await {
        Some(ev) => Ok(ev?),
        None => Err(eyre!("terminal input closed")),
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let Event::Key(k) = event else {
        return matches!(event, Event::Resize(..)).then_some(UserEvent::Redraw);
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if state.mode == Mode::QuitModal {
        return match k.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    let command = match k.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('c') => Command::Connect,
        KeyCode::Char('s') => Command::StartRound,
        KeyCode::Char('n') => Command::Continue,
        KeyCode::Char('u') => Command::Submit,
        KeyCode::Char('l') => Command::RefreshLeaderboard,
        KeyCode::Char(c) => {
            let selection = c.to_digit(10)? as usize;
            if !(1..=PUMPKINS).contains(&selection) {
                return None;
            }
            Command::Pick(selection)
        }
        _ => return None,
    };
    Some(UserEvent::Command(command))
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, view: &ViewModel) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, view))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, view: &ViewModel) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // wallet + network
            Constraint::Length(6), // player stats
            Constraint::Length(7), // pumpkin patch
            Constraint::Min(6),    // leaderboard
            Constraint::Length(6), // status + help
        ])
        .split(f.area());

    draw_header(f, chunks[0], view);
    draw_player(f, chunks[1], view);
    draw_patch(f, chunks[2], view);
    draw_leaderboard(f, chunks[3], view);
    draw_bottom(f, chunks[4], view);
    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(Paragraph::new("Leave the pumpkin patch? (Y/N)"), block.inner(area));
    }
}

fn draw_header(f: &mut Frame, area: Rect, view: &ViewModel) {
    let wallet = view.wallet.as_deref().unwrap_or("Not connected");
    let (network, color) = match &view.network {
        NetworkStatus::Unknown => (String::from("Unknown"), Color::DarkGray),
        NetworkStatus::Correct => (String::from("Somnia Testnet"), Color::Green),
        NetworkStatus::Wrong { chain_id } => (format!("Wrong network ({chain_id})"), Color::Red),
    };
    let line = Line::from(vec![
        Span::raw(format!("Wallet: {wallet} | Network: ")),
        Span::styled(network, Style::default().fg(color)),
        Span::raw(format!(" | Contract: {}", view.scoreboard.contract)),
    ]);
    let widget = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("🎃 Pumpkin Patch"),
    );
    f.render_widget(widget, area);
}

fn draw_player(f: &mut Frame, area: Rect, view: &ViewModel) {
    let s = &view.scoreboard;
    let fee = s
        .game_fee
        .map(format_fee)
        .unwrap_or_else(|| String::from("N/A"));
    let lines = vec![
        Line::from(format!(
            "Score: {} | Attempts: {}/{}",
            s.score, s.attempts_used, s.max_attempts
        )),
        Line::from(format!("High score: {} | Games played: {}", s.high_score, s.total_games)),
        Line::from(format!("Last played: {}", format_last_played(s.last_played))),
        Line::from(format!("Game fee: {fee}")),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Player"));
    f.render_widget(widget, area);
}

fn draw_patch(f: &mut Frame, area: Rect, view: &ViewModel) {
    let block = Block::default().borders(Borders::ALL).title("Pumpkins");
    if !view.round_visible {
        let hint = Paragraph::new("Connect your wallet (c) to start picking pumpkins")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(hint, area);
        return;
    }
    let inner = block.inner(area);
    f.render_widget(block, area);
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, PUMPKINS as u32); PUMPKINS])
        .split(inner);
    for (idx, rect) in cells.iter().enumerate() {
        let number = idx + 1;
        let picked = view.reveal.filter(|r| r.selection == number);
        let width = rect.width.saturating_sub(2) as usize;
        let (body, style) = match picked {
            Some(reveal) => (
                outcome_label(&reveal.outcome),
                Style::default().fg(severity_color(reveal.outcome.kind.severity())),
            ),
            None => (String::from("🎃"), Style::default()),
        };
        let lines = vec![
            Line::from(center(&body, width)),
            Line::from(center(&number.to_string(), width)),
        ];
        let cell = Paragraph::new(lines)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(cell, *rect);
    }
}

fn draw_leaderboard(f: &mut Frame, area: Rect, view: &ViewModel) {
    let lines: Vec<Line> = match &view.leaderboard {
        LeaderboardView::Loading => vec![Line::from("Loading...")],
        LeaderboardView::Unavailable => vec![Line::from(Span::styled(
            "Error loading leaderboard",
            Style::default().fg(Color::Red),
        ))],
        LeaderboardView::Entries(entries) if entries.is_empty() => {
            vec![Line::from("No scores yet")]
        }
        LeaderboardView::Entries(entries) => entries
            .iter()
            .map(|e| Line::from(format!("#{:<3} {:<14} {} points", e.rank, e.address, e.score)))
            .collect(),
    };
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Leaderboard"));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, view: &ViewModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    let status = Paragraph::new(view.status.as_str())
        .style(Style::default().fg(severity_color(view.severity)))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[0]);

    let help = Paragraph::new(help_line(view))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn help_line(view: &ViewModel) -> String {
    let mut keys = Vec::new();
    if view.shows(Affordance::Connect) {
        keys.push("c connect");
    }
    if view.shows(Affordance::Start) {
        keys.push("s start round");
    }
    if view.round_visible && view.reveal.is_none() && !view.shows(Affordance::Start) {
        keys.push("1-6 pick");
    }
    if view.shows(Affordance::Continue) {
        keys.push("n continue");
    }
    if view.shows(Affordance::Submit) {
        keys.push("u submit score");
    }
    keys.push("l leaderboard");
    keys.push("q/Esc quit");
    keys.join(" | ")
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn outcome_label(outcome: &Outcome) -> String {
    let icon = outcome.message.split_whitespace().next().unwrap_or_default();
    format!("{icon} {:+}", outcome.points)
}

fn center(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width()) / 2;
    format!("{}{text}", " ".repeat(pad))
}

pub fn format_fee(wei: u128) -> String {
    let unit = 10u128.pow(STT_DECIMALS);
    let whole = wei / unit;
    let frac = wei % unit;
    if frac == 0 {
        return format!("{whole} STT");
    }
    let digits = format!("{frac:0>width$}", width = STT_DECIMALS as usize);
    format!("{whole}.{} STT", digits.trim_end_matches('0'))
}

pub fn format_last_played(last_played: Option<u64>) -> String {
    last_played
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| String::from("Never"))
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
