//! Messages posted to the controller by timers and backend requests.
//!
//! Every asynchronous result reaches [`AuctionController`](crate::controller::AuctionController)
//! through one channel and is applied on the controller's task, so state is
//! only ever mutated from one place.

use auction_core::gateway::GatewayResult;
use auction_core::protocol::{
    BestBid, CandidateBid, PlacedBid, RemainingTimeResponse, WinnerResponse,
};
use tokio::sync::mpsc;

pub(crate) type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub(crate) type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Why remaining time was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeFetch {
    Initial,
    Resync,
}

#[derive(Debug)]
pub(crate) enum EngineEvent {
    RemainingTimeFetched {
        purpose: TimeFetch,
        result: GatewayResult<RemainingTimeResponse>,
    },
    /// One countdown second elapsed for the clock armed at `generation`.
    Tick { generation: u64 },
    /// The polling timer armed at `generation` fired.
    PollDue { generation: u64 },
    BestBidFetched {
        seq: u64,
        result: GatewayResult<Option<BestBid>>,
    },
    BidPlaced {
        candidate: CandidateBid,
        result: GatewayResult<PlacedBid>,
    },
    ResyncDue,
    RevealElapsed,
    WinnerFetched {
        result: GatewayResult<WinnerResponse>,
    },
}
