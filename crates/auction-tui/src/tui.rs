//! Ratatui TUI frontend for the live auction view.
//!
//! Pure UI module: terminal lifecycle, rendering, and input → intent mapping.
//! All auction state lives in [`auction_client::auction_state`] and all
//! engine logic in [`auction_client::controller`]. This module has no
//! networking dependencies.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io::{self, Stdout};

use auction_client::auction_state::{AuctionEvent, AuctionState, Lifecycle, LogCategory};
use auction_client::resolver::WinnerResult;
use auction_core::protocol::{AuctionType, format_amount};
use auction_core::validator;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

// ---------------------------------------------------------------------------
// UserIntent: result of processing user input
// ---------------------------------------------------------------------------

/// The result of processing a user input event.
#[derive(Debug, PartialEq)]
pub enum UserIntent {
    /// No action needed (e.g. the event was purely cosmetic).
    None,
    /// The user wants to leave the auction.
    Quit,
    /// The user wants to place a bid. `None` when the input is not a number.
    SubmitBid(Option<f64>),
}

// ---------------------------------------------------------------------------
// TUI-only state
// ---------------------------------------------------------------------------

/// UI-layer state that lives alongside (but separate from) the auction state.
#[derive(Default)]
struct TuiState {
    /// Bid amount input buffer
    bid_input: String,
    /// Bid input cursor position (in chars)
    bid_cursor: usize,
    /// Show help popup
    show_help: bool,
    /// Advances once per frame while the reveal plays.
    spin_frame: usize,
}

impl TuiState {
    fn move_cursor_left(&mut self) {
        self.bid_cursor = self.bid_cursor.saturating_sub(1);
    }

    fn move_cursor_right(&mut self) {
        self.bid_cursor = (self.bid_cursor + 1).min(self.bid_input.chars().count());
    }

    fn byte_index(&self) -> usize {
        self.bid_input
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.bid_cursor)
            .unwrap_or(self.bid_input.len())
    }

    fn enter_char(&mut self, c: char) {
        // One decimal separator at most.
        if c == '.' && self.bid_input.contains('.') {
            return;
        }
        let index = self.byte_index();
        self.bid_input.insert(index, c);
        self.move_cursor_right();
    }

    fn delete_char(&mut self) {
        if self.bid_cursor == 0 {
            return;
        }
        let before = self.bid_input.chars().take(self.bid_cursor - 1);
        let after = self.bid_input.chars().skip(self.bid_cursor);
        self.bid_input = before.chain(after).collect();
        self.move_cursor_left();
    }

    fn clear_bid_input(&mut self) {
        self.bid_input.clear();
        self.bid_cursor = 0;
    }

    fn bid_amount(&self) -> Option<f64> {
        validator::parse_amount(&self.bid_input)
    }
}

// ---------------------------------------------------------------------------
// Tui
// ---------------------------------------------------------------------------

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: TuiState,
}

impl Tui {
    /// Enter raw mode and the alternate screen.
    pub fn setup() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self {
            terminal,
            state: TuiState::default(),
        })
    }

    /// Restore the terminal.
    pub fn teardown(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn render(&mut self, auction: &AuctionState) -> io::Result<()> {
        if auction.spinning {
            self.state.spin_frame = self.state.spin_frame.wrapping_add(1);
        }
        let tui = &self.state;
        self.terminal.draw(|frame| ui(frame, auction, tui))?;
        Ok(())
    }

    /// Non-blocking: handle at most one pending terminal event.
    /// Returns `None` when no key was pressed.
    pub fn poll_and_handle_input(
        &mut self,
        auction: &AuctionState,
    ) -> io::Result<Option<UserIntent>> {
        if !event::poll(std::time::Duration::from_millis(0))? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        Ok(Some(self.handle_key_event(key, auction)))
    }

    /// The bid left the client; start a fresh entry.
    pub fn on_bid_sent(&mut self) {
        self.state.clear_bid_input();
    }

    fn handle_key_event(&mut self, key: KeyEvent, auction: &AuctionState) -> UserIntent {
        let tui = &mut self.state;
        match key.code {
            KeyCode::Esc => {
                if tui.show_help {
                    tui.show_help = false;
                    UserIntent::None
                } else {
                    UserIntent::Quit
                }
            }
            KeyCode::F(1) => {
                tui.show_help = !tui.show_help;
                UserIntent::None
            }
            KeyCode::Enter => {
                if tui.show_help || !auction.can_bid() {
                    return UserIntent::None;
                }
                UserIntent::SubmitBid(tui.bid_amount())
            }
            KeyCode::Char(c) => {
                if !tui.show_help && (c.is_ascii_digit() || c == '.') {
                    tui.enter_char(c);
                }
                UserIntent::None
            }
            KeyCode::Backspace => {
                if !tui.show_help {
                    tui.delete_char();
                }
                UserIntent::None
            }
            KeyCode::Left => {
                tui.move_cursor_left();
                UserIntent::None
            }
            KeyCode::Right => {
                tui.move_cursor_right();
                UserIntent::None
            }
            _ => UserIntent::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn ui(frame: &mut Frame, auction: &AuctionState, tui: &TuiState) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Countdown + best bid
            Constraint::Min(8),    // Bids + log
            Constraint::Length(4), // Bid input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_board(frame, auction, tui, main_layout[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30), // Own bids
            Constraint::Min(40),    // Log
        ])
        .split(main_layout[1]);
    render_my_bids(frame, auction, content_layout[0]);
    render_messages(frame, auction, content_layout[1]);

    if let Some(cursor) = render_bid_input(frame, auction, tui, main_layout[2]) {
        frame.set_cursor_position(cursor);
    }

    let (status_text, status_color) = lifecycle_badge(auction.lifecycle);
    let status = Paragraph::new(Line::from(vec![
        Span::styled(format!("● {status_text}"), Style::default().fg(status_color)),
        Span::raw(" | "),
        Span::styled("F1", Style::default().fg(Color::Cyan).bold()),
        Span::raw(": Help | "),
        Span::styled("ESC", Style::default().fg(Color::Cyan).bold()),
        Span::raw(": Leave | Ticket: "),
        Span::styled(
            auction.session.ticket_id.as_str(),
            Style::default().fg(Color::Cyan),
        ),
    ]));
    frame.render_widget(status, main_layout[3]);

    if tui.show_help {
        render_help_popup(frame, auction.auction_type());
    }
}

fn lifecycle_badge(lifecycle: Lifecycle) -> (&'static str, Color) {
    match lifecycle {
        Lifecycle::Initializing => ("Connecting", Color::Yellow),
        Lifecycle::Active => ("Live", Color::Green),
        Lifecycle::Ending => ("Ended", Color::Magenta),
        Lifecycle::Resolved => ("Resolved", Color::Cyan),
        Lifecycle::Failed => ("Failed", Color::Red),
    }
}

fn render_board(frame: &mut Frame, auction: &AuctionState, tui: &TuiState, area: Rect) {
    let mut lines = vec![];

    let countdown_color = match auction.remaining {
        0..=10 => Color::Red,
        11..=30 => Color::Yellow,
        _ => Color::Green,
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!(" {} ", auction.auction_type().label().to_uppercase()),
            Style::default().fg(Color::Black).bg(Color::Yellow).bold(),
        ),
        Span::raw("  "),
        Span::styled("Time left: ", Style::default().fg(Color::Gray)),
        Span::styled(
            auction.countdown_label(),
            Style::default().fg(countdown_color).bold(),
        ),
    ]));
    lines.push(Line::from(""));

    let best_label = match auction.auction_type() {
        AuctionType::Ascending => "Highest bid: ",
        AuctionType::Descending => "Lowest bid: ",
    };
    let best_line = match &auction.best_bid {
        Some(best) => {
            let owner = if auction.leading() {
                " (you)".to_string()
            } else {
                format!(" by {}", best.ticket_id)
            };
            vec![
                Span::styled(best_label, Style::default().fg(Color::Gray)),
                Span::styled(
                    format_amount(best.amount),
                    Style::default().fg(Color::Green).bold(),
                ),
                Span::styled(owner, Style::default().fg(Color::White)),
            ]
        }
        None => vec![
            Span::styled(best_label, Style::default().fg(Color::Gray)),
            Span::styled("no bids yet", Style::default().fg(Color::DarkGray)),
        ],
    };
    lines.push(Line::from(best_line));
    lines.push(Line::from(""));
    lines.push(reveal_line(auction, tui));

    let board = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(format!(" Auction {} ", auction.session.session_id))
            .title_style(Style::default().fg(Color::Magenta).bold()),
    );
    frame.render_widget(board, area);
}

fn reveal_line(auction: &AuctionState, tui: &TuiState) -> Line<'static> {
    if auction.spinning {
        let spinner = SPINNER[tui.spin_frame % SPINNER.len()];
        return Line::from(Span::styled(
            format!("{spinner} Spinning the wheel ({:.0}°) {spinner}", auction.wheel_rotation),
            Style::default().fg(Color::Yellow).bold(),
        ));
    }
    match &auction.winner {
        WinnerResult::Winner(_) if auction.is_winner() => Line::from(Span::styled(
            "🏆 You won the auction! 🏆",
            Style::default().fg(Color::Green).bold(),
        )),
        WinnerResult::Winner(ticket) => Line::from(Span::styled(
            format!("Winner: ticket {ticket}"),
            Style::default().fg(Color::Cyan).bold(),
        )),
        WinnerResult::Undetermined => Line::from(Span::styled(
            "Unable to determine winner",
            Style::default().fg(Color::Red),
        )),
        WinnerResult::Unresolved => match auction.lifecycle {
            Lifecycle::Ending => Line::from(Span::styled(
                "Fetching winner...",
                Style::default().fg(Color::Yellow),
            )),
            Lifecycle::Failed => Line::from(Span::styled(
                auction
                    .last_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "Auction unavailable".to_string()),
                Style::default().fg(Color::Red),
            )),
            _ => Line::from(""),
        },
    }
}

fn render_my_bids(frame: &mut Frame, auction: &AuctionState, area: Rect) {
    let items: Vec<ListItem> = auction
        .my_bids
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|bid| {
            ListItem::new(Line::from(vec![
                Span::styled(bid.placed_at.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::styled(
                    format_amount(bid.amount),
                    Style::default().fg(Color::White).bold(),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" My bids ")
            .title_style(Style::default().fg(Color::Green).bold()),
    );
    frame.render_widget(list, area);
}

fn render_messages(frame: &mut Frame, auction: &AuctionState, area: Rect) {
    let messages: Vec<ListItem> = auction
        .events
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .rev()
        .map(|ev| {
            let style = match ev.category() {
                LogCategory::System => Style::default().fg(Color::Yellow),
                LogCategory::Bid => Style::default().fg(Color::Green),
                LogCategory::Winner => Style::default().fg(Color::Cyan).bold(),
                LogCategory::Error => Style::default().fg(Color::Red),
                LogCategory::Info => Style::default().fg(Color::Gray),
            };
            ListItem::new(Span::styled(format_event(ev), style))
        })
        .collect();

    let messages_list = List::new(messages).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Log ")
            .title_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(messages_list, area);
}

fn format_event(event: &AuctionEvent) -> String {
    match event {
        AuctionEvent::Activated { .. } => format!("🔔 {event}"),
        AuctionEvent::BidPlaced { .. } => format!("✅ {event}"),
        AuctionEvent::BidRejected { .. } | AuctionEvent::Error { .. } => format!("❌ {event}"),
        AuctionEvent::WinnerAnnounced { .. } => format!("🏆 {event}"),
        _ => event.to_string(),
    }
}

/// Draws the bid entry box and returns the terminal cursor position.
fn render_bid_input(
    frame: &mut Frame,
    auction: &AuctionState,
    tui: &TuiState,
    area: Rect,
) -> Option<(u16, u16)> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" Your bid ")
        .title_style(Style::default().fg(Color::Blue).bold());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let active = auction.lifecycle == Lifecycle::Active;
    let hint = if !active {
        Span::styled(
            "Bidding is closed",
            Style::default().fg(Color::DarkGray),
        )
    } else if auction.placing_bid {
        Span::styled("Placing bid...", Style::default().fg(Color::Yellow))
    } else if tui.bid_input.trim().is_empty() {
        Span::styled(
            "Type an amount and press Enter",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        match validator::explain(
            tui.bid_amount(),
            auction.auction_type(),
            auction.best_bid.as_ref(),
        ) {
            Some(message) => Span::styled(message, Style::default().fg(Color::Red)),
            None => Span::styled("✓ valid bid", Style::default().fg(Color::Green)),
        }
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Blue)),
            Span::styled(tui.bid_input.clone(), Style::default().fg(Color::White)),
        ]),
        Line::from(hint),
    ];
    frame.render_widget(Paragraph::new(lines), inner);

    if !active || inner.height == 0 {
        return None;
    }
    let x = inner.x + 2 + tui.bid_cursor as u16;
    Some((x.min(inner.right().saturating_sub(1)), inner.y))
}

fn render_help_popup(frame: &mut Frame, auction_type: AuctionType) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let rule = match auction_type {
        AuctionType::Ascending => "  Each bid must be higher than the current best",
        AuctionType::Descending => "  Each bid must be lower than the current best",
    };
    let help_text = Text::from(vec![
        Line::from(vec![Span::styled(
            "CONTROLS",
            Style::default().fg(Color::Yellow).bold(),
        )]),
        Line::from(""),
        Line::from("  0-9 .         Type bid amount"),
        Line::from("  Backspace     Edit bid amount"),
        Line::from("  Left/Right    Move cursor"),
        Line::from("  Enter         Place bid"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  RULES",
            Style::default().fg(Color::Cyan).bold(),
        )]),
        Line::from(rule),
        Line::from("  When time runs out the winner is revealed"),
        Line::from(""),
        Line::from("  F1            Toggle this help"),
        Line::from("  ESC           Leave the auction"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press ESC or F1 to close",
            Style::default().fg(Color::DarkGray),
        )]),
    ]);

    let help = Paragraph::new(help_text).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help ")
            .title_style(Style::default().fg(Color::Cyan).bold())
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
