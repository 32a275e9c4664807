//! Client orchestrator: connects the auction engine and the TUI frontend.
//!
//! This module owns the event loop and drives:
//! - [`auction_client::controller::AuctionController`]: engine and state machine
//! - [`crate::tui::Tui`]: ratatui TUI frontend
//!
//! This module is specific to the TUI binary.

use std::sync::Arc;

use auction_client::auction_state::LogCategory;
use auction_client::config::ClientConfig;
use auction_client::controller::{AuctionController, PollResult};
use auction_client::http_gateway::HttpGateway;
use auction_core::protocol::SessionRef;
use tracing::{info, warn};

use crate::tui::{Tui, UserIntent};

/// Join a live auction and run the view until the user leaves.
pub async fn start_client(
    session: SessionRef,
    config: ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = HttpGateway::new(&config)?;
    info!(
        session_id = %session.session_id,
        base_url = %gateway.base_url(),
        "joining auction"
    );

    let backend = format!("Backend: {}", gateway.base_url());
    let mut ctrl = AuctionController::new(session, Arc::new(gateway), config);
    ctrl.add_message(backend, LogCategory::Info);
    // A refused start leaves the view in `Failed`, which the TUI renders.
    if let Err(err) = ctrl.start() {
        warn!(error = %err, "auction could not be entered");
    }

    let mut tui = Tui::setup()?;
    let result = run_event_loop(&mut tui, &mut ctrl).await;
    ctrl.teardown();
    tui.teardown()?;
    result
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

async fn run_event_loop(
    tui: &mut Tui,
    ctrl: &mut AuctionController,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut dirty = true;
    loop {
        // The reveal animates every frame.
        if dirty || ctrl.state().spinning {
            tui.render(ctrl.state())?;
            dirty = false;
        }

        let timeout = tokio::time::Duration::from_millis(50);

        tokio::select! {
            poll = ctrl.recv() => {
                match poll {
                    PollResult::Updated(changed) => dirty |= changed.any(),
                    PollResult::Empty => {}
                    PollResult::TornDown => break,
                }
            }

            _ = tokio::time::sleep(timeout) => {
                let Some(intent) = tui.poll_and_handle_input(ctrl.state())? else {
                    continue;
                };
                dirty = true;
                match intent {
                    UserIntent::Quit => break,
                    UserIntent::SubmitBid(amount) => {
                        if ctrl.submit_bid(amount).is_ok() {
                            tui.on_bid_sent();
                        }
                    }
                    UserIntent::None => {}
                }
            }
        }
    }

    Ok(())
}
