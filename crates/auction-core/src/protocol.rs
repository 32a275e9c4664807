use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Direction of an auction. Selects the endpoint family and the bid rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionType {
    /// Highest bid wins.
    #[serde(rename = "increasing")]
    Ascending,
    /// Lowest bid wins.
    #[serde(rename = "decreasing")]
    Descending,
}

impl AuctionType {
    pub const ALL: [AuctionType; 2] = [AuctionType::Ascending, AuctionType::Descending];

    /// Path segment of the endpoint family serving this direction.
    pub fn family(self) -> &'static str {
        match self {
            AuctionType::Ascending => "bets",
            AuctionType::Descending => "decrease-bets",
        }
    }

    /// Path segment of the leading-bid query for this direction.
    pub fn best_bid_segment(self) -> &'static str {
        match self {
            AuctionType::Ascending => "highest",
            AuctionType::Descending => "lowest",
        }
    }

    /// Name used on the wire and in navigation parameters.
    pub fn wire_name(self) -> &'static str {
        match self {
            AuctionType::Ascending => "increasing",
            AuctionType::Descending => "decreasing",
        }
    }

    /// Human-readable label for UI display.
    pub fn label(self) -> &'static str {
        match self {
            AuctionType::Ascending => "Ascending",
            AuctionType::Descending => "Descending",
        }
    }
}

impl fmt::Display for AuctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Returned when an auction direction string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown auction type `{0}` (expected increasing or decreasing)")]
pub struct ParseAuctionTypeError(pub String);

impl FromStr for AuctionType {
    type Err = ParseAuctionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increasing" | "ascending" | "asc" => Ok(AuctionType::Ascending),
            "decreasing" | "descending" | "desc" => Ok(AuctionType::Descending),
            other => Err(ParseAuctionTypeError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Session reference
// ---------------------------------------------------------------------------

/// Why a [`SessionRef`] cannot be used to enter an auction view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionRefError {
    #[error("missing session ID")]
    MissingSessionId,
    #[error("missing ticket ID")]
    MissingTicketId,
    #[error("invalid session ID: {0}")]
    InvalidSessionId(String),
}

/// Identifies the auction a participant is viewing and the ticket they bid
/// with. Immutable for the lifetime of one auction view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub session_id: String,
    pub auction_type: AuctionType,
    pub ticket_id: String,
}

impl SessionRef {
    pub fn new(
        session_id: impl Into<String>,
        auction_type: AuctionType,
        ticket_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            auction_type,
            ticket_id: ticket_id.into(),
        }
    }

    /// Check the entry preconditions: both IDs present, session ID usable
    /// as a path segment.
    pub fn check(&self) -> Result<(), SessionRefError> {
        if self.session_id.trim().is_empty() {
            return Err(SessionRefError::MissingSessionId);
        }
        if self.ticket_id.trim().is_empty() {
            return Err(SessionRefError::MissingTicketId);
        }
        validate_session_id(&self.session_id).map_err(SessionRefError::InvalidSessionId)
    }
}

/// Validate a session ID.
///
/// Session IDs are interpolated into request paths, so they must be non-empty,
/// at most 64 characters, and free of whitespace and URL delimiters.
pub fn validate_session_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("Session ID cannot be empty".to_string());
    }
    if id.chars().count() > 64 {
        return Err("Session ID must be at most 64 characters".to_string());
    }
    if id
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'))
    {
        return Err("Session ID must not contain whitespace or URL delimiters".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

/// The currently leading bid as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestBid {
    pub ticket_id: String,
    pub amount: f64,
}

/// A bid being validated or submitted for one user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBid {
    pub ticket_id: String,
    pub amount: f64,
}

/// The backend's record of an accepted bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedBid {
    pub ticket_id: String,
    pub amount: f64,
    #[serde(default)]
    pub session_id: String,
}

impl From<PlacedBid> for BestBid {
    fn from(bid: PlacedBid) -> Self {
        Self {
            ticket_id: bid.ticket_id,
            amount: bid.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    pub ticket_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingTimeResponse {
    pub remaining_seconds: i64,
}

impl RemainingTimeResponse {
    /// Remaining seconds clamped to the non-negative `u32` range.
    pub fn seconds(self) -> u32 {
        u32::try_from(self.remaining_seconds.max(0)).unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Session listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Inactive,
    Ended,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Active => "active",
            SessionStatus::Inactive => "inactive",
            SessionStatus::Ended => "ended",
            SessionStatus::Unknown => "unknown",
        })
    }
}

/// Summary row returned by the session listing and status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(rename = "type", default)]
    pub auction_type: Option<AuctionType>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub highest_bet: Option<f64>,
    #[serde(default)]
    pub lowest_bet: Option<f64>,
    #[serde(default)]
    pub participant_count: Option<u32>,
}

impl SessionSummary {
    /// The leading amount for the session's direction, if reported.
    pub fn leading_amount(&self) -> Option<f64> {
        match self.auction_type {
            Some(AuctionType::Descending) => self.lowest_bet,
            _ => self.highest_bet,
        }
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Format a bid amount, dropping the fraction for whole numbers.
pub fn format_amount(amount: impl Borrow<f64>) -> String {
    let amount = *amount.borrow();
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    }
}

/// Format a countdown as `M:SS`.
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
