//! Error taxonomy of the auction engine.

use std::fmt;

use auction_core::gateway::GatewayError;
use auction_core::protocol::SessionRefError;
use auction_core::validator::BidRejection;
use thiserror::Error;

use crate::auction_state::Lifecycle;

/// Which periodic query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    RemainingTime,
    BestBid,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Query::RemainingTime => "remaining time",
            Query::BestBid => "best bid",
        })
    }
}

/// Failures surfaced by the engine while an auction view is alive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuctionError {
    /// Session or ticket information is missing. Fatal.
    #[error("Missing session or ticket information: {0}")]
    PreconditionMissing(#[from] SessionRefError),
    /// The initial remaining-time fetch failed. Fatal.
    #[error("Failed to get auction time information")]
    InitializationFailed(#[source] GatewayError),
    /// A poll or resync failed; the previous value is kept.
    #[error("{query} query failed")]
    TransientQueryFailure {
        query: Query,
        #[source]
        source: GatewayError,
    },
    /// The backend refused a bid.
    #[error("{message}")]
    SubmissionRejected {
        message: String,
        #[source]
        source: GatewayError,
    },
    /// The winner query failed; the winner is recorded as undetermined.
    #[error("Unable to determine winner")]
    ResolutionFailure(#[source] GatewayError),
}

impl AuctionError {
    /// Fatal errors move the lifecycle to `Failed`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuctionError::PreconditionMissing(_) | AuctionError::InitializationFailed(_)
        )
    }
}

/// Local rejection of a bid submission. No request was sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Bids are only accepted while the auction is live (currently {0})")]
    NotActive(Lifecycle),
    #[error("{0}")]
    Invalid(#[from] BidRejection),
    #[error("Auction has ended")]
    CountdownElapsed,
    #[error("A bid is already being placed")]
    InFlight,
}

/// Errors raised while loading or validating [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file `{path}`")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{field}` must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error("backend base URL must start with http:// or https:// (got `{0}`)")]
    InvalidBaseUrl(String),
}
