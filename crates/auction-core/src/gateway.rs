//! Backend gateway abstraction.
//!
//! Decouples the auction engine from the HTTP plumbing. The engine only sees
//! [`BackendGateway`]; the reqwest implementation lives in `auction-client`
//! and tests substitute an in-memory fake.

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::protocol::{
    AuctionType, BestBid, CandidateBid, PlacedBid, RemainingTimeResponse, SessionSummary,
    WinnerResponse,
};

/// Convenient result alias returning [`GatewayError`] failures.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures that can occur while talking to the auction backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request could not be sent or no response arrived.
    #[error("failed to send request to `{path}`: {message}")]
    Transport { path: String, message: String },
    /// The backend answered with a non-success status.
    #[error("unexpected response status {status} for `{path}`")]
    Status {
        path: String,
        status: u16,
        /// `message` field of the backend's JSON error body, if any.
        message: Option<String>,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response for `{path}`: {message}")]
    Decode { path: String, message: String },
    /// The configured base URL is unusable.
    #[error("invalid backend base URL `{url}`")]
    InvalidBaseUrl { url: String },
}

impl GatewayError {
    /// The backend-supplied explanation, when the backend sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            GatewayError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations the auction backend exposes.
///
/// Every method returns a `'static` future so callers can move the request
/// into a spawned task and let it complete independently of the caller.
pub trait BackendGateway: Send + Sync + 'static {
    /// Create (activate) a session.
    fn activate_session(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>>;

    fn stop_session(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>>;

    fn session_status(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<SessionSummary>>;

    fn active_sessions(
        &self,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Vec<SessionSummary>>>;

    fn place_bid(
        &self,
        session_id: &str,
        auction_type: AuctionType,
        bid: &CandidateBid,
    ) -> BoxFuture<'static, GatewayResult<PlacedBid>>;

    /// Leading bid for the direction (highest or lowest). `None` when the
    /// session has no bids yet.
    fn best_bid(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Option<BestBid>>>;

    fn winner(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<WinnerResponse>>;

    fn remaining_time(
        &self,
        session_id: &str,
    ) -> BoxFuture<'static, GatewayResult<RemainingTimeResponse>>;
}

// ---------------------------------------------------------------------------
// Endpoint paths
// ---------------------------------------------------------------------------

/// Request paths relative to the backend base URL.
pub mod paths {
    use crate::protocol::AuctionType;

    pub fn activate(auction_type: AuctionType, session_id: &str) -> String {
        format!("/{}/session/activate/{session_id}", auction_type.family())
    }

    pub fn stop(auction_type: AuctionType, session_id: &str) -> String {
        format!("/{}/session/stop/{session_id}", auction_type.family())
    }

    pub fn status(auction_type: AuctionType, session_id: &str) -> String {
        format!("/{}/session/status/{session_id}", auction_type.family())
    }

    pub fn active_sessions(auction_type: AuctionType) -> String {
        format!("/{}/sessions/active", auction_type.family())
    }

    pub fn place(auction_type: AuctionType, session_id: &str) -> String {
        format!("/{}/place/{session_id}", auction_type.family())
    }

    pub fn best_bid(auction_type: AuctionType, session_id: &str) -> String {
        format!(
            "/{}/{}/{session_id}",
            auction_type.family(),
            auction_type.best_bid_segment()
        )
    }

    pub fn winner(auction_type: AuctionType, session_id: &str) -> String {
        format!("/{}/winner/{session_id}", auction_type.family())
    }

    /// Remaining time is served outside both endpoint families.
    pub fn remaining_time(session_id: &str) -> String {
        format!("/session-time/remaining/{session_id}")
    }
}
