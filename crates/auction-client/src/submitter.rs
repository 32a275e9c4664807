//! Bid submission and reconciliation of the backend's answer.

use std::sync::Arc;

use auction_core::gateway::{BackendGateway, GatewayResult};
use auction_core::protocol::{BestBid, CandidateBid, PlacedBid, SessionRef};
use auction_core::validator;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auction_state::Lifecycle;
use crate::error::{AuctionError, SubmitError};
use crate::events::{EngineEvent, EventSender};
use crate::scheduler::RequestSet;

/// Shown when the backend rejects a bid without an explanation.
pub const GENERIC_REJECTION: &str = "Failed to place bid";

/// A bid this participant placed successfully during the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnBid {
    pub ticket_id: String,
    pub amount: f64,
    /// UTC wall-clock time of acceptance, `HH:MM:SS`.
    pub placed_at: String,
}

/// Engine state a submission is checked against.
#[derive(Debug, Clone, Copy)]
pub struct SubmitContext<'a> {
    pub lifecycle: Lifecycle,
    pub remaining: u32,
    pub best: Option<&'a BestBid>,
}

pub struct BidSubmitter {
    gateway: Arc<dyn BackendGateway>,
    session: SessionRef,
    events: EventSender,
    in_flight: Option<CandidateBid>,
    history: Vec<OwnBid>,
    requests: RequestSet,
}

impl BidSubmitter {
    pub(crate) fn new(
        gateway: Arc<dyn BackendGateway>,
        session: SessionRef,
        events: EventSender,
    ) -> Self {
        Self {
            gateway,
            session,
            events,
            in_flight: None,
            history: Vec::new(),
            requests: RequestSet::new(),
        }
    }

    /// Check `amount` locally and, if it passes, send it to the backend.
    ///
    /// Nothing is sent when the auction is not live, the amount is invalid,
    /// the local countdown has reached zero, or another bid is still in
    /// flight. A request already sent is never cancelled by expiry; the
    /// backend decides whether it counts.
    pub fn submit(
        &mut self,
        amount: Option<f64>,
        ctx: SubmitContext<'_>,
    ) -> Result<CandidateBid, SubmitError> {
        if ctx.lifecycle != Lifecycle::Active {
            return Err(SubmitError::NotActive(ctx.lifecycle));
        }
        let amount = validator::check(amount, self.session.auction_type, ctx.best)?;
        if ctx.remaining == 0 {
            return Err(SubmitError::CountdownElapsed);
        }
        if self.in_flight.is_some() {
            return Err(SubmitError::InFlight);
        }

        let candidate = CandidateBid {
            ticket_id: self.session.ticket_id.clone(),
            amount,
        };
        let request = self.gateway.place_bid(
            &self.session.session_id,
            self.session.auction_type,
            &candidate,
        );
        let events = self.events.clone();
        let sent = candidate.clone();
        self.requests.spawn(async move {
            let result = request.await;
            let _ = events.send(EngineEvent::BidPlaced {
                candidate: sent,
                result,
            });
        });
        debug!(amount, ticket_id = %candidate.ticket_id, "bid sent");
        self.in_flight = Some(candidate.clone());
        Ok(candidate)
    }

    /// Reconcile the backend's answer to a submitted bid.
    pub(crate) fn complete(
        &mut self,
        candidate: &CandidateBid,
        result: GatewayResult<PlacedBid>,
    ) -> Result<PlacedBid, AuctionError> {
        if self.in_flight.as_ref() == Some(candidate) {
            self.in_flight = None;
        }
        match result {
            Ok(placed) => {
                info!(amount = placed.amount, ticket_id = %placed.ticket_id, "bid accepted");
                self.history.push(OwnBid {
                    ticket_id: placed.ticket_id.clone(),
                    amount: placed.amount,
                    placed_at: utc_clock_time(),
                });
                Ok(placed)
            }
            Err(source) => {
                let message = source
                    .backend_message()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(GENERIC_REJECTION)
                    .to_string();
                warn!(amount = candidate.amount, error = %source, "bid rejected by backend");
                Err(AuctionError::SubmissionRejected { message, source })
            }
        }
    }

    pub fn in_flight(&self) -> Option<&CandidateBid> {
        self.in_flight.as_ref()
    }

    pub fn history(&self) -> &[OwnBid] {
        &self.history
    }

    /// Drop any in-flight submission; its answer will never arrive.
    pub(crate) fn abort(&mut self) {
        self.requests.abort_all();
        self.in_flight = None;
    }
}

fn utc_clock_time() -> String {
    let now = OffsetDateTime::now_utc();
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::gateway::GatewayError;
    use auction_core::protocol::AuctionType;
    use auction_core::validator::BidRejection;
    use tokio::sync::mpsc;

    use crate::events::EventReceiver;
    use crate::testing::{FakeGateway, Op};

    fn submitter(fake: &FakeGateway, auction_type: AuctionType) -> (BidSubmitter, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = SessionRef::new("s1", auction_type, "t1");
        (BidSubmitter::new(fake.gateway(), session, tx), rx)
    }

    fn live(best: Option<&BestBid>) -> SubmitContext<'_> {
        SubmitContext {
            lifecycle: Lifecycle::Active,
            remaining: 30,
            best,
        }
    }

    #[tokio::test]
    async fn local_rejections_send_nothing() {
        let fake = FakeGateway::new();
        let (mut submitter, _rx) = submitter(&fake, AuctionType::Descending);
        let best = BestBid {
            ticket_id: "other".into(),
            amount: 50.0,
        };

        assert_eq!(
            submitter.submit(Some(60.0), live(Some(&best))),
            Err(SubmitError::Invalid(BidRejection::NotLower { current: 50.0 }))
        );
        assert_eq!(
            submitter.submit(None, live(Some(&best))),
            Err(SubmitError::Invalid(BidRejection::NotPositive))
        );
        let elapsed = SubmitContext {
            remaining: 0,
            ..live(Some(&best))
        };
        assert_eq!(
            submitter.submit(Some(40.0), elapsed),
            Err(SubmitError::CountdownElapsed)
        );
        let ending = SubmitContext {
            lifecycle: Lifecycle::Ending,
            ..live(None)
        };
        assert_eq!(
            submitter.submit(Some(40.0), ending),
            Err(SubmitError::NotActive(Lifecycle::Ending))
        );
        assert_eq!(fake.calls(Op::PlaceBid), 0);
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_refused() {
        let fake = FakeGateway::new();
        let _gate = fake.hold(Op::PlaceBid);
        let (mut submitter, _rx) = submitter(&fake, AuctionType::Ascending);

        let sent = submitter.submit(Some(10.0), live(None)).unwrap();
        assert_eq!(sent.ticket_id, "t1");
        assert_eq!(
            submitter.submit(Some(11.0), live(None)),
            Err(SubmitError::InFlight)
        );
        assert_eq!(fake.calls(Op::PlaceBid), 1);
    }

    #[tokio::test]
    async fn accepted_bid_is_recorded() {
        let fake = FakeGateway::new();
        let (mut submitter, mut rx) = submitter(&fake, AuctionType::Ascending);
        submitter.submit(Some(25.5), live(None)).unwrap();

        let Some(EngineEvent::BidPlaced { candidate, result }) = rx.recv().await else {
            panic!("expected bid response");
        };
        let placed = submitter.complete(&candidate, result).unwrap();
        assert_eq!(placed.amount, 25.5);
        assert!(submitter.in_flight().is_none());

        let history = submitter.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 25.5);
        assert_eq!(history[0].placed_at.len(), 8);
        assert_eq!(history[0].placed_at.matches(':').count(), 2);
    }

    #[test]
    fn backend_message_is_surfaced() {
        let fake = FakeGateway::new();
        let (mut submitter, _rx) = submitter(&fake, AuctionType::Ascending);
        let candidate = CandidateBid {
            ticket_id: "t1".into(),
            amount: 10.0,
        };

        let err = submitter
            .complete(
                &candidate,
                Err(GatewayError::Status {
                    path: "/bets/place/s1".into(),
                    status: 409,
                    message: Some("Auction session is not active".into()),
                }),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Auction session is not active");

        let err = submitter
            .complete(
                &candidate,
                Err(GatewayError::Transport {
                    path: "/bets/place/s1".into(),
                    message: "connection reset".into(),
                }),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), GENERIC_REJECTION);
        assert!(submitter.history().is_empty());
    }
}
