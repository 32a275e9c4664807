//! Winner lookup at the end of the auction.

use std::fmt;
use std::sync::Arc;

use auction_core::gateway::{BackendGateway, GatewayResult};
use auction_core::protocol::{SessionRef, WinnerResponse};
use tracing::{info, warn};

use crate::error::AuctionError;
use crate::events::{EngineEvent, EventSender};
use crate::scheduler::RequestSet;

/// Outcome of the winner lookup. Set once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WinnerResult {
    #[default]
    Unresolved,
    Winner(String),
    /// The lookup failed; the auction still completes.
    Undetermined,
}

impl WinnerResult {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, WinnerResult::Unresolved)
    }

    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            WinnerResult::Winner(ticket) => Some(ticket),
            _ => None,
        }
    }
}

impl fmt::Display for WinnerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinnerResult::Unresolved => f.write_str("pending"),
            WinnerResult::Winner(ticket) => write!(f, "Winner: {ticket}"),
            WinnerResult::Undetermined => f.write_str("Unable to determine winner"),
        }
    }
}

pub struct WinnerResolver {
    gateway: Arc<dyn BackendGateway>,
    session: SessionRef,
    events: EventSender,
    requested: bool,
    result: WinnerResult,
    requests: RequestSet,
}

impl WinnerResolver {
    pub(crate) fn new(
        gateway: Arc<dyn BackendGateway>,
        session: SessionRef,
        events: EventSender,
    ) -> Self {
        Self {
            gateway,
            session,
            events,
            requested: false,
            result: WinnerResult::Unresolved,
            requests: RequestSet::new(),
        }
    }

    /// Query the backend for the winning ticket. Only the first call sends
    /// a request; returns whether this call did.
    pub fn resolve(&mut self) -> bool {
        if self.requested {
            return false;
        }
        self.requested = true;
        let request = self
            .gateway
            .winner(&self.session.session_id, self.session.auction_type);
        let events = self.events.clone();
        self.requests.spawn(async move {
            let result = request.await;
            let _ = events.send(EngineEvent::WinnerFetched { result });
        });
        info!(session_id = %self.session.session_id, "winner requested");
        true
    }

    /// Record the lookup outcome. Returns `None` if a result was already set.
    pub(crate) fn complete(
        &mut self,
        result: GatewayResult<WinnerResponse>,
    ) -> Option<Result<&WinnerResult, AuctionError>> {
        if self.result.is_resolved() {
            return None;
        }
        match result {
            Ok(winner) => {
                info!(ticket_id = %winner.ticket_id, "winner resolved");
                self.result = WinnerResult::Winner(winner.ticket_id);
                Some(Ok(&self.result))
            }
            Err(err) => {
                warn!(error = %err, "winner lookup failed");
                self.result = WinnerResult::Undetermined;
                Some(Err(AuctionError::ResolutionFailure(err)))
            }
        }
    }

    pub fn result(&self) -> &WinnerResult {
        &self.result
    }

    pub(crate) fn abort(&mut self) {
        self.requests.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::gateway::GatewayError;
    use auction_core::protocol::AuctionType;
    use tokio::sync::mpsc;

    use crate::testing::{FakeGateway, Op};

    fn resolver(fake: &FakeGateway) -> (WinnerResolver, crate::events::EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = SessionRef::new("s1", AuctionType::Ascending, "t1");
        (WinnerResolver::new(fake.gateway(), session, tx), rx)
    }

    #[tokio::test]
    async fn queries_once() {
        let fake = FakeGateway::new();
        fake.set_winner(Ok("t9".into()));
        let (mut resolver, mut rx) = resolver(&fake);

        assert!(resolver.resolve());
        assert!(!resolver.resolve());

        let Some(EngineEvent::WinnerFetched { result }) = rx.recv().await else {
            panic!("expected winner response");
        };
        let resolved = resolver.complete(result).unwrap().unwrap().clone();
        assert_eq!(resolved, WinnerResult::Winner("t9".into()));
        assert_eq!(fake.calls(Op::Winner), 1);
    }

    #[test]
    fn failure_is_undetermined_and_final() {
        let fake = FakeGateway::new();
        let (mut resolver, _rx) = resolver(&fake);
        let err = GatewayError::Status {
            path: "/bets/winner/s1".into(),
            status: 404,
            message: None,
        };

        let outcome = resolver.complete(Err(err.clone())).unwrap();
        assert_eq!(outcome.unwrap_err(), AuctionError::ResolutionFailure(err));
        assert_eq!(resolver.result(), &WinnerResult::Undetermined);

        let late = resolver.complete(Ok(WinnerResponse {
            ticket_id: "t2".into(),
        }));
        assert!(late.is_none());
        assert_eq!(resolver.result(), &WinnerResult::Undetermined);
        assert_eq!(resolver.result().to_string(), "Unable to determine winner");
    }
}
