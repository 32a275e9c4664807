//! One-shot session management commands: create, list, status, stop.

use auction_client::config::ClientConfig;
use auction_client::http_gateway::HttpGateway;
use auction_core::gateway::BackendGateway;
use auction_core::protocol::{AuctionType, SessionSummary, format_amount, validate_session_id};
use tracing::info;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub async fn create(config: &ClientConfig, session_id: &str, auction_type: AuctionType) -> CmdResult {
    validate_session_id(session_id)?;
    let gateway = HttpGateway::new(config)?;
    gateway.activate_session(session_id, auction_type).await?;
    info!(session_id, %auction_type, "session activated");
    println!("Activated {} session '{session_id}'", auction_type.label().to_lowercase());
    Ok(())
}

pub async fn stop(config: &ClientConfig, session_id: &str, auction_type: AuctionType) -> CmdResult {
    validate_session_id(session_id)?;
    let gateway = HttpGateway::new(config)?;
    gateway.stop_session(session_id, auction_type).await?;
    info!(session_id, %auction_type, "session stopped");
    println!("Stopped session '{session_id}'");
    Ok(())
}

pub async fn status(config: &ClientConfig, session_id: &str, auction_type: AuctionType) -> CmdResult {
    validate_session_id(session_id)?;
    let gateway = HttpGateway::new(config)?;
    let summary = gateway.session_status(session_id, auction_type).await?;
    println!("{}", summary_row(&summary));
    Ok(())
}

/// List active sessions of one direction, or of both when `auction_type` is `None`.
pub async fn list(config: &ClientConfig, auction_type: Option<AuctionType>) -> CmdResult {
    let gateway = HttpGateway::new(config)?;
    let types = match auction_type {
        Some(t) => vec![t],
        None => AuctionType::ALL.to_vec(),
    };
    for auction_type in types {
        let sessions = gateway.active_sessions(auction_type).await?;
        info!(%auction_type, count = sessions.len(), "listed active sessions");
        println!("{} auctions ({}):", auction_type.label(), sessions.len());
        for summary in &sessions {
            println!("  {}", summary_row(summary));
        }
    }
    Ok(())
}

fn summary_row(summary: &SessionSummary) -> String {
    let mut row = summary.session_id.clone();
    if let Some(name) = &summary.session_name {
        row.push_str(&format!(" \"{name}\""));
    }
    if let Some(status) = summary.status {
        row.push_str(&format!(" [{status}]"));
    }
    match summary.leading_amount() {
        Some(amount) => row.push_str(&format!(" best {}", format_amount(amount))),
        None => row.push_str(" no bids"),
    }
    if let Some(count) = summary.participant_count {
        row.push_str(&format!(", {count} participants"));
    }
    if let Some(duration) = summary.duration {
        row.push_str(&format!(", {duration}s"));
    }
    row
}
