//! Leading-bid polling.

use std::sync::Arc;
use std::time::Duration;

use auction_core::gateway::{BackendGateway, GatewayError, GatewayResult};
use auction_core::protocol::{BestBid, SessionRef};
use tracing::debug;

use crate::events::{EngineEvent, EventSender};
use crate::scheduler::{RequestSet, TimerSlot};

/// Result of applying one poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The best bid was replaced with a different value.
    Updated,
    /// The response matched the known value.
    Unchanged,
    /// An older response arrived after a newer value was applied; dropped.
    Stale,
    /// The query failed. The previous value is kept.
    Failed(GatewayError),
}

/// Tracks the current leading bid for one session.
///
/// Every response carries the sequence number of the request that produced
/// it. A response is only applied when it is newer than everything applied
/// so far, so late responses from slow requests never roll the value back.
pub struct BestBidTracker {
    gateway: Arc<dyn BackendGateway>,
    session: SessionRef,
    events: EventSender,
    best: Option<BestBid>,
    observed: bool,
    /// Sequence number of the last query issued.
    issued: u64,
    /// Responses with a sequence number at or below this are discarded.
    floor: u64,
    generation: u64,
    timer: TimerSlot,
    requests: RequestSet,
}

impl BestBidTracker {
    pub(crate) fn new(
        gateway: Arc<dyn BackendGateway>,
        session: SessionRef,
        events: EventSender,
    ) -> Self {
        Self {
            gateway,
            session,
            events,
            best: None,
            observed: false,
            issued: 0,
            floor: 0,
            generation: 0,
            timer: TimerSlot::new(),
            requests: RequestSet::new(),
        }
    }

    /// Poll now, then every `interval` until [`stop_polling`](Self::stop_polling).
    pub fn start_polling(&mut self, interval: Duration) {
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        self.timer.repeat(interval, true, move || {
            events.send(EngineEvent::PollDue { generation }).is_ok()
        });
        debug!(
            session_id = %self.session.session_id,
            interval_ms = interval.as_millis() as u64,
            "best bid polling started"
        );
    }

    /// Stop the polling timer and drop any poll still in flight. Idempotent.
    pub fn stop_polling(&mut self) {
        self.timer.cancel();
        self.generation += 1;
        self.requests.abort_all();
        self.floor = self.issued;
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_armed()
    }

    /// Handle a firing of the polling timer armed at `generation`.
    /// Returns `false` when the firing belongs to a stopped timer.
    pub(crate) fn on_poll_due(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.timer.is_armed() {
            return false;
        }
        self.poll();
        true
    }

    /// Issue one query for the leading bid.
    pub fn poll(&mut self) {
        self.issued += 1;
        let seq = self.issued;
        let request = self
            .gateway
            .best_bid(&self.session.session_id, self.session.auction_type);
        let events = self.events.clone();
        self.requests.spawn(async move {
            let result = request.await;
            let _ = events.send(EngineEvent::BestBidFetched { seq, result });
        });
        debug!(seq, "best bid poll issued");
    }

    /// Apply the response to query `seq`.
    pub(crate) fn apply(&mut self, seq: u64, result: GatewayResult<Option<BestBid>>) -> PollOutcome {
        if seq <= self.floor {
            return PollOutcome::Stale;
        }
        match result {
            Ok(best) => {
                self.floor = seq;
                if best.is_some() {
                    self.observed = true;
                }
                if best == self.best {
                    return PollOutcome::Unchanged;
                }
                self.best = best;
                PollOutcome::Updated
            }
            Err(err) => PollOutcome::Failed(err),
        }
    }

    /// Replace the value with an authoritative bid from a submission
    /// response. Polls issued before this point are discarded.
    pub(crate) fn replace(&mut self, bid: BestBid) -> bool {
        self.floor = self.issued;
        self.observed = true;
        if self.best.as_ref() == Some(&bid) {
            return false;
        }
        self.best = Some(bid);
        true
    }

    pub fn best(&self) -> Option<&BestBid> {
        self.best.as_ref()
    }

    /// Whether any bid has been seen for this session.
    pub fn has_observed_bid(&self) -> bool {
        self.observed
    }
}
