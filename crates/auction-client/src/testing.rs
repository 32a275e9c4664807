//! Scriptable in-memory backend for engine tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use auction_core::gateway::{BackendGateway, GatewayError, GatewayResult};
use auction_core::protocol::{
    AuctionType, BestBid, CandidateBid, PlacedBid, RemainingTimeResponse, SessionSummary,
    WinnerResponse,
};
use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Activate,
    Stop,
    Status,
    ActiveSessions,
    PlaceBid,
    BestBid,
    Winner,
    RemainingTime,
}

struct Script {
    remaining: GatewayResult<i64>,
    best: Option<BestBid>,
    best_error: Option<GatewayError>,
    place_error: Option<GatewayError>,
    winner: GatewayResult<String>,
    sessions: Vec<SessionSummary>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            remaining: Ok(60),
            best: None,
            best_error: None,
            place_error: None,
            winner: Err(status_error("/winner", 404)),
            sessions: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Shared {
    script: Mutex<Script>,
    calls: Mutex<HashMap<Op, usize>>,
    gates: Mutex<HashMap<Op, Arc<Semaphore>>>,
}

/// Backend double. Clones share the same script and call log.
#[derive(Clone, Default)]
pub(crate) struct FakeGateway {
    shared: Arc<Shared>,
}

pub(crate) fn status_error(path: &str, status: u16) -> GatewayError {
    GatewayError::Status {
        path: path.to_string(),
        status,
        message: None,
    }
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn gateway(&self) -> Arc<dyn BackendGateway> {
        Arc::new(self.clone())
    }

    fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.shared.script.lock().unwrap());
    }

    pub(crate) fn set_remaining(&self, remaining: GatewayResult<i64>) {
        self.edit(|s| s.remaining = remaining);
    }

    pub(crate) fn set_best(&self, best: Option<BestBid>) {
        self.edit(|s| s.best = best);
    }

    /// Make every best-bid query fail until cleared with `None`.
    pub(crate) fn fail_best_bid(&self, error: Option<GatewayError>) {
        self.edit(|s| s.best_error = error);
    }

    pub(crate) fn reject_bids(&self, error: Option<GatewayError>) {
        self.edit(|s| s.place_error = error);
    }

    pub(crate) fn set_winner(&self, winner: GatewayResult<String>) {
        self.edit(|s| s.winner = winner);
    }

    pub(crate) fn calls(&self, op: Op) -> usize {
        self.shared
            .calls
            .lock()
            .unwrap()
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Hold every response to `op` until a permit is added to the returned
    /// semaphore. One permit releases one response.
    pub(crate) fn hold(&self, op: Op) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.shared
            .gates
            .lock()
            .unwrap()
            .insert(op, Arc::clone(&gate));
        gate
    }

    fn respond<T, F>(&self, op: Op, produce: F) -> BoxFuture<'static, GatewayResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut Script) -> GatewayResult<T> + Send + 'static,
    {
        *self.shared.calls.lock().unwrap().entry(op).or_default() += 1;
        let gate = self.shared.gates.lock().unwrap().get(&op).cloned();
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            let mut script = shared.script.lock().unwrap();
            produce(&mut script)
        })
    }
}

impl BackendGateway for FakeGateway {
    fn activate_session(
        &self,
        _session_id: &str,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        self.respond(Op::Activate, |_| Ok(()))
    }

    fn stop_session(
        &self,
        _session_id: &str,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        self.respond(Op::Stop, |_| Ok(()))
    }

    fn session_status(
        &self,
        session_id: &str,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<SessionSummary>> {
        let session_id = session_id.to_string();
        self.respond(Op::Status, move |s| {
            s.sessions
                .iter()
                .find(|summary| summary.session_id == session_id)
                .cloned()
                .ok_or_else(|| status_error("/session/status", 404))
        })
    }

    fn active_sessions(
        &self,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Vec<SessionSummary>>> {
        self.respond(Op::ActiveSessions, |s| Ok(s.sessions.clone()))
    }

    fn place_bid(
        &self,
        session_id: &str,
        _auction_type: AuctionType,
        bid: &CandidateBid,
    ) -> BoxFuture<'static, GatewayResult<PlacedBid>> {
        let placed = PlacedBid {
            ticket_id: bid.ticket_id.clone(),
            amount: bid.amount,
            session_id: session_id.to_string(),
        };
        self.respond(Op::PlaceBid, move |s| {
            if let Some(err) = &s.place_error {
                return Err(err.clone());
            }
            s.best = Some(BestBid::from(placed.clone()));
            Ok(placed)
        })
    }

    fn best_bid(
        &self,
        _session_id: &str,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Option<BestBid>>> {
        self.respond(Op::BestBid, |s| match &s.best_error {
            Some(err) => Err(err.clone()),
            None => Ok(s.best.clone()),
        })
    }

    fn winner(
        &self,
        _session_id: &str,
        _auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<WinnerResponse>> {
        self.respond(Op::Winner, |s| {
            s.winner
                .clone()
                .map(|ticket_id| WinnerResponse { ticket_id })
        })
    }

    fn remaining_time(
        &self,
        _session_id: &str,
    ) -> BoxFuture<'static, GatewayResult<RemainingTimeResponse>> {
        self.respond(Op::RemainingTime, |s| {
            s.remaining
                .clone()
                .map(|remaining_seconds| RemainingTimeResponse { remaining_seconds })
        })
    }
}
