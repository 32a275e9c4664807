//! Framework-agnostic auction controller.
//!
//! Owns every engine component for one auction view and the
//! [`AuctionState`] they feed, providing the lifecycle
//! `Initializing → Active → Ending → Resolved` (or `Failed`).
//!
//! Timers and backend requests post their results to one channel; the
//! controller applies them in [`AuctionController::recv`] /
//! [`AuctionController::try_recv`], so state is only mutated from the task
//! that owns the controller.
//!
//! Frontends only need to:
//! 1. Call [`AuctionController::start`] once.
//! 2. Call [`AuctionController::recv`] (e.g. in a `tokio::select!` loop) and
//!    re-render from [`AuctionController::state`].
//! 3. Call [`AuctionController::submit_bid`] for user bids.
//! 4. Call [`AuctionController::teardown`] (or drop the controller) on exit.

use std::sync::Arc;

use auction_core::gateway::{BackendGateway, GatewayError, GatewayResult};
use auction_core::protocol::{
    BestBid, CandidateBid, PlacedBid, RemainingTimeResponse, SessionRef, WinnerResponse,
};
use auction_core::validator;
use rand::RngExt;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::auction_state::{AuctionEvent, AuctionState, Lifecycle, LogCategory, StateChanged};
use crate::best_bid::{BestBidTracker, PollOutcome};
use crate::config::ClientConfig;
use crate::countdown::{ClockSignal, CountdownClock};
use crate::error::{AuctionError, Query, SubmitError};
use crate::events::{EngineEvent, EventReceiver, EventSender, TimeFetch};
use crate::resolver::{WinnerResolver, WinnerResult};
use crate::scheduler::{RequestSet, TimerSlot};
use crate::submitter::{BidSubmitter, SubmitContext};

/// Base rotation of the reveal wheel: ten full turns.
const WHEEL_BASE_ROTATION: f64 = 3600.0;

/// Outcome of processing a single engine event.
#[derive(Debug)]
pub enum PollResult {
    /// An event was applied; the returned [`StateChanged`] flags describe
    /// what was modified.
    Updated(StateChanged),
    /// The view was torn down; nothing will change any more.
    TornDown,
    /// No event was available (channel empty).
    Empty,
}

/// Drives one auction view.
pub struct AuctionController {
    gateway: Arc<dyn BackendGateway>,
    config: ClientConfig,
    state: AuctionState,
    clock: CountdownClock,
    tracker: BestBidTracker,
    submitter: BidSubmitter,
    resolver: WinnerResolver,
    reveal: TimerSlot,
    resync: TimerSlot,
    requests: RequestSet,
    events_tx: EventSender,
    events_rx: EventReceiver,
    started: bool,
    torn_down: bool,
}

impl AuctionController {
    pub fn new(session: SessionRef, gateway: Arc<dyn BackendGateway>, config: ClientConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            clock: CountdownClock::new(events_tx.clone()),
            tracker: BestBidTracker::new(Arc::clone(&gateway), session.clone(), events_tx.clone()),
            submitter: BidSubmitter::new(Arc::clone(&gateway), session.clone(), events_tx.clone()),
            resolver: WinnerResolver::new(Arc::clone(&gateway), session.clone(), events_tx.clone()),
            state: AuctionState::new(session),
            gateway,
            config,
            reveal: TimerSlot::new(),
            resync: TimerSlot::new(),
            requests: RequestSet::new(),
            events_tx,
            events_rx,
            started: false,
            torn_down: false,
        }
    }

    /// Enter the auction: check the session reference and fetch the
    /// authoritative remaining time.
    ///
    /// Idempotent; calls after the first (or after teardown) do nothing.
    /// A missing session or ticket moves the lifecycle to `Failed` without
    /// contacting the backend.
    pub fn start(&mut self) -> Result<(), AuctionError> {
        if self.started || self.torn_down {
            return Ok(());
        }
        self.started = true;

        if let Err(missing) = self.state.session.check() {
            let err = AuctionError::from(missing);
            error!(error = %err, "cannot enter auction");
            self.record_error(err.clone());
            return Err(err);
        }

        info!(
            session_id = %self.state.session.session_id,
            auction_type = %self.state.session.auction_type,
            ticket_id = %self.state.session.ticket_id,
            "entering auction"
        );
        self.fetch_remaining_time(TimeFetch::Initial);
        Ok(())
    }

    /// Try to receive and apply one engine event (non-blocking).
    pub fn try_recv(&mut self) -> PollResult {
        if self.torn_down {
            return PollResult::TornDown;
        }
        match self.events_rx.try_recv() {
            Ok(event) => PollResult::Updated(self.handle_event(event)),
            Err(TryRecvError::Empty) => PollResult::Empty,
            Err(TryRecvError::Disconnected) => PollResult::TornDown,
        }
    }

    /// Await the next engine event and apply it.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` branch.
    pub async fn recv(&mut self) -> PollResult {
        if self.torn_down {
            return PollResult::TornDown;
        }
        match self.events_rx.recv().await {
            Some(event) => PollResult::Updated(self.handle_event(event)),
            None => PollResult::TornDown,
        }
    }

    /// Validate `amount` and send it as a bid for our ticket.
    ///
    /// Local rejections are returned immediately and no request is sent.
    /// The backend's answer arrives later through [`recv`](Self::recv).
    pub fn submit_bid(&mut self, amount: Option<f64>) -> Result<(), SubmitError> {
        if self.torn_down {
            return Err(SubmitError::NotActive(self.state.lifecycle));
        }
        let ctx = SubmitContext {
            lifecycle: self.state.lifecycle,
            remaining: self.clock.remaining(),
            best: self.tracker.best(),
        };
        match self.submitter.submit(amount, ctx) {
            Ok(candidate) => {
                info!(amount = candidate.amount, "placing bid");
                self.state.placing_bid = true;
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "bid refused locally");
                self.state.add_event(AuctionEvent::BidRejected {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Live validation feedback for a candidate amount, `None` when valid.
    pub fn validation_message(&self, amount: Option<f64>) -> Option<String> {
        validator::explain(amount, self.state.session.auction_type, self.tracker.best())
    }

    /// Leave the view: cancel every timer and drop every in-flight request.
    ///
    /// Idempotent. After teardown no event changes the state, including
    /// responses that were already on their way.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.clock.stop();
        self.tracker.stop_polling();
        self.submitter.abort();
        self.resolver.abort();
        self.reveal.cancel();
        self.resync.cancel();
        self.requests.abort_all();
        while self.events_rx.try_recv().is_ok() {}
        info!(session_id = %self.state.session.session_id, "auction view closed");
    }

    /// Borrow the current [`AuctionState`].
    pub fn state(&self) -> &AuctionState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    /// Append a local feedback message to the event log.
    ///
    /// Frontends should call this instead of mutating `AuctionState`
    /// directly, keeping the controller as the single mutation gateway.
    pub fn add_message(&mut self, text: String, category: LogCategory) {
        self.state.add_message(text, category);
    }

    // -- private -----------------------------------------------------------

    fn handle_event(&mut self, event: EngineEvent) -> StateChanged {
        let mut changed = StateChanged::default();
        match event {
            EngineEvent::RemainingTimeFetched {
                purpose: TimeFetch::Initial,
                result,
            } => self.on_initial_time(result, &mut changed),
            EngineEvent::RemainingTimeFetched {
                purpose: TimeFetch::Resync,
                result,
            } => self.on_resync(result, &mut changed),
            EngineEvent::Tick { generation } => match self.clock.on_tick(generation) {
                Some(ClockSignal::Ticked(remaining)) => {
                    self.state.remaining = remaining;
                    changed.countdown = true;
                }
                Some(ClockSignal::Expired) => {
                    self.state.remaining = 0;
                    changed.countdown = true;
                    self.enter_ending(&mut changed);
                }
                None => {}
            },
            EngineEvent::PollDue { generation } => {
                if self.state.lifecycle == Lifecycle::Active {
                    self.tracker.on_poll_due(generation);
                }
            }
            EngineEvent::BestBidFetched { seq, result } => {
                self.on_best_bid(seq, result, &mut changed)
            }
            EngineEvent::BidPlaced { candidate, result } => {
                self.on_bid_placed(&candidate, result, &mut changed)
            }
            EngineEvent::ResyncDue => {
                if self.state.lifecycle == Lifecycle::Active {
                    self.fetch_remaining_time(TimeFetch::Resync);
                }
            }
            EngineEvent::RevealElapsed => {
                if self.state.lifecycle == Lifecycle::Ending {
                    self.state.spinning = false;
                    changed.reveal = true;
                    self.resolver.resolve();
                }
            }
            EngineEvent::WinnerFetched { result } => self.on_winner(result, &mut changed),
        }
        changed
    }

    fn fetch_remaining_time(&mut self, purpose: TimeFetch) {
        let request = self.gateway.remaining_time(&self.state.session.session_id);
        let events = self.events_tx.clone();
        self.requests.spawn(async move {
            let result = request.await;
            let _ = events.send(EngineEvent::RemainingTimeFetched { purpose, result });
        });
    }

    fn on_initial_time(
        &mut self,
        result: GatewayResult<RemainingTimeResponse>,
        changed: &mut StateChanged,
    ) {
        if self.state.lifecycle != Lifecycle::Initializing {
            return;
        }
        changed.lifecycle = true;
        changed.log = true;
        let seconds = match result {
            Ok(time) => time.seconds(),
            Err(source) => {
                let err = AuctionError::InitializationFailed(source);
                error!(session_id = %self.state.session.session_id, error = %err, "auction initialization failed");
                self.record_error(err);
                return;
            }
        };

        info!(session_id = %self.state.session.session_id, seconds, "auction active");
        self.state.lifecycle = Lifecycle::Active;
        self.state.remaining = seconds;
        changed.countdown = true;
        self.state
            .add_event(AuctionEvent::Activated { remaining: seconds });

        self.clock.start(seconds);
        self.tracker.start_polling(self.config.poll_interval);
        if let Some(period) = self.config.resync_interval {
            let events = self.events_tx.clone();
            self.resync.repeat(period, false, move || {
                events.send(EngineEvent::ResyncDue).is_ok()
            });
        }
    }

    fn on_resync(&mut self, result: GatewayResult<RemainingTimeResponse>, changed: &mut StateChanged) {
        if self.state.lifecycle != Lifecycle::Active {
            return;
        }
        match result {
            Ok(time) => {
                let seconds = time.seconds();
                debug!(local = self.state.remaining, seconds, "countdown resynchronized");
                self.clock.start(seconds);
                self.state.remaining = seconds;
                changed.countdown = true;
            }
            Err(source) => self.transient_failure(Query::RemainingTime, source, changed),
        }
    }

    fn on_best_bid(
        &mut self,
        seq: u64,
        result: GatewayResult<Option<BestBid>>,
        changed: &mut StateChanged,
    ) {
        match self.tracker.apply(seq, result) {
            PollOutcome::Updated => {
                let best = self.tracker.best().cloned();
                debug!(seq, amount = best.as_ref().map(|b| b.amount), "best bid changed");
                self.state.best_bid = best.clone();
                self.state.add_event(AuctionEvent::BestBidChanged { best });
                changed.best_bid = true;
                changed.log = true;
            }
            PollOutcome::Unchanged | PollOutcome::Stale => {}
            PollOutcome::Failed(source) => {
                self.transient_failure(Query::BestBid, source, changed)
            }
        }
    }

    fn on_bid_placed(
        &mut self,
        candidate: &CandidateBid,
        result: GatewayResult<PlacedBid>,
        changed: &mut StateChanged,
    ) {
        let outcome = self.submitter.complete(candidate, result);
        self.state.placing_bid = self.submitter.in_flight().is_some();
        changed.bids = true;
        changed.log = true;
        match outcome {
            Ok(placed) => {
                let amount = placed.amount;
                if self.tracker.replace(placed.into()) {
                    self.state.best_bid = self.tracker.best().cloned();
                    changed.best_bid = true;
                }
                if let Some(bid) = self.submitter.history().last() {
                    self.state.my_bids.push(bid.clone());
                }
                self.state.add_event(AuctionEvent::BidPlaced { amount });
                // Pick up a competing bid that landed around ours.
                if self.state.lifecycle == Lifecycle::Active {
                    self.tracker.poll();
                }
            }
            Err(err) => {
                self.state.add_event(AuctionEvent::BidRejected {
                    reason: err.to_string(),
                });
                self.state.last_error = Some(err);
            }
        }
    }

    fn enter_ending(&mut self, changed: &mut StateChanged) {
        if self.state.lifecycle != Lifecycle::Active {
            return;
        }
        self.state.lifecycle = Lifecycle::Ending;
        changed.lifecycle = true;
        changed.log = true;
        self.clock.stop();
        self.tracker.stop_polling();
        self.resync.cancel();

        let reveal = self.tracker.has_observed_bid();
        info!(session_id = %self.state.session.session_id, reveal, "auction ended");
        self.state.add_event(AuctionEvent::AuctionEnded { reveal });

        if reveal {
            self.state.spinning = true;
            self.state.wheel_rotation =
                WHEEL_BASE_ROTATION + rand::rng().random_range(0.0..360.0);
            changed.reveal = true;
            let events = self.events_tx.clone();
            self.reveal.once(self.config.reveal_duration, move || {
                let _ = events.send(EngineEvent::RevealElapsed);
            });
        } else {
            self.resolver.resolve();
        }
    }

    fn on_winner(&mut self, result: GatewayResult<WinnerResponse>, changed: &mut StateChanged) {
        if self.state.lifecycle != Lifecycle::Ending {
            return;
        }
        let outcome = match self.resolver.complete(result) {
            Some(outcome) => outcome.map(WinnerResult::clone),
            None => return,
        };
        match outcome {
            Ok(WinnerResult::Winner(ticket_id)) => {
                let ours = ticket_id == self.state.session.ticket_id;
                self.state
                    .add_event(AuctionEvent::WinnerAnnounced { ticket_id, ours });
            }
            Ok(_) => self.state.add_event(AuctionEvent::WinnerUndetermined),
            Err(err) => {
                self.state.last_error = Some(err);
                self.state.add_event(AuctionEvent::WinnerUndetermined);
            }
        }
        self.state.winner = self.resolver.result().clone();
        self.state.spinning = false;
        self.state.lifecycle = Lifecycle::Resolved;
        changed.lifecycle = true;
        changed.winner = true;
        changed.log = true;
        info!(session_id = %self.state.session.session_id, winner = %self.state.winner, "auction resolved");
    }

    fn transient_failure(
        &mut self,
        query: Query,
        source: GatewayError,
        changed: &mut StateChanged,
    ) {
        let err = AuctionError::TransientQueryFailure { query, source };
        warn!(session_id = %self.state.session.session_id, error = %err, "query failed; keeping last value");
        self.record_error(err);
        changed.log = true;
    }

    /// Surface `err`; fatal errors also end the view in `Failed`.
    fn record_error(&mut self, err: AuctionError) {
        if err.is_fatal() {
            self.clock.stop();
            self.tracker.stop_polling();
            self.resync.cancel();
            self.state.lifecycle = Lifecycle::Failed;
        }
        self.state.add_event(AuctionEvent::Error { error: err.clone() });
        self.state.last_error = Some(err);
    }
}

impl Drop for AuctionController {
    fn drop(&mut self) {
        self.teardown();
    }
}
