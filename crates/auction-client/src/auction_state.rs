use std::collections::VecDeque;
use std::fmt;

use auction_core::protocol::{AuctionType, BestBid, SessionRef, format_amount, format_countdown};

use crate::error::AuctionError;
use crate::resolver::WinnerResult;
use crate::submitter::OwnBid;

/// Maximum number of entries kept in the event log.
const EVENT_LOG_CAPACITY: usize = 100;

/// Lifecycle of one auction view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Waiting for the initial remaining-time fetch.
    Initializing,
    /// Countdown running, best bid polled, bids accepted.
    Active,
    /// Countdown expired; reveal playing or winner being fetched.
    Ending,
    /// Winner known (or explicitly undetermined). Terminal.
    Resolved,
    /// Could not enter the auction. Terminal.
    Failed,
}

impl Lifecycle {
    pub fn is_terminal(self) -> bool {
        matches!(self, Lifecycle::Resolved | Lifecycle::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Lifecycle::Initializing => "initializing",
            Lifecycle::Active => "live",
            Lifecycle::Ending => "ending",
            Lifecycle::Resolved => "resolved",
            Lifecycle::Failed => "failed",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Semantic category for log/event messages. The UI layer decides how to style each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    System,
    Bid,
    Winner,
    Error,
    Info,
}

/// A structured auction event. Frontends render these however they see fit.
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionEvent {
    /// The auction went live with this many seconds left.
    Activated { remaining: u32 },
    /// The backend reported a different leading bid.
    BestBidChanged { best: Option<BestBid> },
    /// One of our bids was accepted.
    BidPlaced { amount: f64 },
    /// One of our bids was refused, locally or by the backend.
    BidRejected { reason: String },
    Error { error: AuctionError },
    /// The countdown reached zero.
    AuctionEnded { reveal: bool },
    WinnerAnnounced { ticket_id: String, ours: bool },
    WinnerUndetermined,
    /// Generic text message (used by the UI layer for local feedback).
    Text { text: String, category: LogCategory },
}

impl AuctionEvent {
    /// Semantic category for styling purposes.
    pub fn category(&self) -> LogCategory {
        match self {
            Self::Activated { .. } | Self::AuctionEnded { .. } => LogCategory::System,
            Self::BestBidChanged { .. } => LogCategory::Info,
            Self::BidPlaced { .. } => LogCategory::Bid,
            Self::BidRejected { .. } | Self::Error { .. } => LogCategory::Error,
            Self::WinnerAnnounced { .. } | Self::WinnerUndetermined => LogCategory::Winner,
            Self::Text { category, .. } => *category,
        }
    }
}

impl fmt::Display for AuctionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated { remaining } => {
                write!(f, "Auction is live ({} left)", format_countdown(*remaining))
            }
            Self::BestBidChanged { best: Some(best) } => write!(
                f,
                "New best bid: {} by {}",
                format_amount(best.amount),
                best.ticket_id
            ),
            Self::BestBidChanged { best: None } => f.write_str("No bids yet"),
            Self::BidPlaced { amount } => {
                write!(f, "Bid placed successfully: {}", format_amount(amount))
            }
            Self::BidRejected { reason } => f.write_str(reason),
            Self::Error { error } => write!(f, "{error}"),
            Self::AuctionEnded { reveal: true } => f.write_str("Auction ended, revealing winner..."),
            Self::AuctionEnded { reveal: false } => f.write_str("Auction ended with no bids"),
            Self::WinnerAnnounced { ticket_id, ours: true } => {
                write!(f, "You won! Winning ticket: {ticket_id}")
            }
            Self::WinnerAnnounced { ticket_id, .. } => write!(f, "Winner: {ticket_id}"),
            Self::WinnerUndetermined => f.write_str("Unable to determine winner"),
            Self::Text { text, .. } => f.write_str(text),
        }
    }
}

/// Describes what changed in the auction state after one engine event.
///
/// Frontends can inspect these flags to decide what to re-render or animate.
/// All flags default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanged {
    pub lifecycle: bool,
    pub countdown: bool,
    pub best_bid: bool,
    /// Own-bid history or the in-flight flag changed.
    pub bids: bool,
    pub winner: bool,
    /// The reveal (spin) started or stopped.
    pub reveal: bool,
    /// New entries were appended to the event log.
    pub log: bool,
}

impl StateChanged {
    /// Returns `true` if any flag is set.
    pub fn any(self) -> bool {
        self.lifecycle
            || self.countdown
            || self.best_bid
            || self.bids
            || self.winner
            || self.reveal
            || self.log
    }
}

/// Everything the presentation layer renders for one auction view.
///
/// Owned and mutated only by the controller; frontends read it.
#[derive(Debug, Clone)]
pub struct AuctionState {
    /// Structured auction events, oldest first.
    pub events: VecDeque<AuctionEvent>,
    pub session: SessionRef,
    pub lifecycle: Lifecycle,
    /// Local countdown in seconds.
    pub remaining: u32,
    pub best_bid: Option<BestBid>,
    pub winner: WinnerResult,
    /// Bids this participant placed during the view.
    pub my_bids: Vec<OwnBid>,
    /// A bid request is in flight.
    pub placing_bid: bool,
    /// The reveal animation is playing.
    pub spinning: bool,
    /// Target wheel rotation in degrees for the reveal.
    pub wheel_rotation: f64,
    pub last_error: Option<AuctionError>,
}

impl AuctionState {
    pub fn new(session: SessionRef) -> Self {
        let mut events = VecDeque::new();
        events.push_back(AuctionEvent::Text {
            text: format!(
                "Joining {} auction {} with ticket {}",
                session.auction_type.label(),
                session.session_id,
                session.ticket_id
            ),
            category: LogCategory::System,
        });
        Self {
            events,
            session,
            lifecycle: Lifecycle::Initializing,
            remaining: 0,
            best_bid: None,
            winner: WinnerResult::Unresolved,
            my_bids: Vec::new(),
            placing_bid: false,
            spinning: false,
            wheel_rotation: 0.0,
            last_error: None,
        }
    }

    /// Append an event, keeping only the last 100 entries.
    pub fn add_event(&mut self, event: AuctionEvent) {
        self.events.push_back(event);
        if self.events.len() > EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
    }

    /// Convenience: append an [`AuctionEvent::Text`] for ad-hoc messages.
    pub fn add_message(&mut self, text: String, category: LogCategory) {
        self.add_event(AuctionEvent::Text { text, category });
    }

    pub fn auction_type(&self) -> AuctionType {
        self.session.auction_type
    }

    /// `M:SS` rendering of the countdown.
    pub fn countdown_label(&self) -> String {
        format_countdown(self.remaining)
    }

    pub fn can_bid(&self) -> bool {
        self.lifecycle == Lifecycle::Active && self.remaining > 0 && !self.placing_bid
    }

    /// Whether the leading bid belongs to our ticket.
    pub fn leading(&self) -> bool {
        self.best_bid
            .as_ref()
            .is_some_and(|best| best.ticket_id == self.session.ticket_id)
    }

    pub fn is_winner(&self) -> bool {
        self.winner.ticket_id() == Some(self.session.ticket_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AuctionState {
        AuctionState::new(SessionRef::new("s1", AuctionType::Ascending, "t1"))
    }

    #[test]
    fn event_log_is_capped() {
        let mut state = state();
        for i in 0..150 {
            state.add_message(format!("msg {i}"), LogCategory::Info);
        }
        assert_eq!(state.events.len(), EVENT_LOG_CAPACITY);
        assert_eq!(
            state.events.back(),
            Some(&AuctionEvent::Text {
                text: "msg 149".into(),
                category: LogCategory::Info
            })
        );
    }

    #[test]
    fn event_text() {
        assert_eq!(
            AuctionEvent::BidPlaced { amount: 100.0 }.to_string(),
            "Bid placed successfully: 100"
        );
        assert_eq!(
            AuctionEvent::Activated { remaining: 42 }.to_string(),
            "Auction is live (0:42 left)"
        );
        assert_eq!(
            AuctionEvent::WinnerUndetermined.category(),
            LogCategory::Winner
        );
    }

    #[test]
    fn leading_and_winner_follow_our_ticket() {
        let mut state = state();
        assert!(!state.leading());
        state.best_bid = Some(BestBid {
            ticket_id: "t1".into(),
            amount: 5.0,
        });
        assert!(state.leading());

        state.winner = WinnerResult::Winner("t2".into());
        assert!(!state.is_winner());
        state.winner = WinnerResult::Winner("t1".into());
        assert!(state.is_winner());
    }

    #[test]
    fn bidding_requires_live_countdown() {
        let mut state = state();
        assert!(!state.can_bid());
        state.lifecycle = Lifecycle::Active;
        state.remaining = 3;
        assert!(state.can_bid());
        state.placing_bid = true;
        assert!(!state.can_bid());
        state.placing_bid = false;
        state.remaining = 0;
        assert!(!state.can_bid());
    }

    #[test]
    fn statechanged_any() {
        assert!(!StateChanged::default().any());
        assert!(
            StateChanged {
                winner: true,
                ..Default::default()
            }
            .any()
        );
    }
}
