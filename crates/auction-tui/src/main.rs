use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use auction_client::config::ClientConfig;
use auction_core::protocol::{AuctionType, SessionRef};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod client;
mod sessions;
mod tui;

#[derive(Parser)]
#[command(name = "auction")]
#[command(about = "Join, create and manage live auctions", long_about = None)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct BackendArgs {
    /// Backend base URL (overrides the config file)
    #[arg(short, long, global = true)]
    base_url: Option<String>,

    /// JSON config file (defaults to $AUCTION_CLIENT_CONFIG or config/client.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Enter a live auction and bid
    Join {
        /// Session ID
        #[arg(short, long)]
        session: String,

        /// Ticket ID to bid with
        #[arg(short, long)]
        ticket: String,

        /// Auction type: increasing or decreasing
        #[arg(short = 'y', long = "type", default_value = "increasing")]
        auction_type: AuctionType,

        /// Best-bid polling interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Reveal duration in milliseconds
        #[arg(long)]
        reveal_ms: Option<u64>,

        /// Periodically refetch the remaining time (milliseconds)
        #[arg(long)]
        resync_ms: Option<u64>,

        /// Write logs to this file (otherwise logs are discarded)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Activate a new session
    Create {
        session: String,
        #[arg(short = 'y', long = "type", default_value = "increasing")]
        auction_type: AuctionType,
    },
    /// List active sessions
    List {
        /// Only list this auction type
        #[arg(short = 'y', long = "type")]
        auction_type: Option<AuctionType>,
    },
    /// Show the status of one session
    Status {
        session: String,
        #[arg(short = 'y', long = "type", default_value = "increasing")]
        auction_type: AuctionType,
    },
    /// Stop a session
    Stop {
        session: String,
        #[arg(short = 'y', long = "type", default_value = "increasing")]
        auction_type: AuctionType,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logging must stay off the terminal while the alternate screen is up.
fn init_view_logging(log_file: Option<&PathBuf>) -> std::io::Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

fn load_config(backend: &BackendArgs) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &backend.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load(),
    };
    if let Some(url) = &backend.base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    Ok(config)
}

/// One-shot commands log to stderr.
fn one_shot_config(backend: &BackendArgs) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
    let config = load_config(backend)?;
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Join {
            session,
            ticket,
            auction_type,
            poll_interval_ms,
            reveal_ms,
            resync_ms,
            log_file,
        } => {
            init_view_logging(log_file.as_ref())?;
            let mut config = load_config(&cli.backend)?;
            if let Some(ms) = poll_interval_ms {
                config.poll_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = reveal_ms {
                config.reveal_duration = Duration::from_millis(ms);
            }
            if let Some(ms) = resync_ms {
                config.resync_interval = Some(Duration::from_millis(ms));
            }
            config.validate()?;
            client::start_client(SessionRef::new(session, auction_type, ticket), config).await
        }
        Command::Create {
            session,
            auction_type,
        } => {
            let config = one_shot_config(&cli.backend)?;
            sessions::create(&config, &session, auction_type).await
        }
        Command::List { auction_type } => {
            let config = one_shot_config(&cli.backend)?;
            sessions::list(&config, auction_type).await
        }
        Command::Status {
            session,
            auction_type,
        } => {
            let config = one_shot_config(&cli.backend)?;
            sessions::status(&config, &session, auction_type).await
        }
        Command::Stop {
            session,
            auction_type,
        } => {
            let config = one_shot_config(&cli.backend)?;
            sessions::stop(&config, &session, auction_type).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn join_parses_overrides() {
        let cli = Cli::parse_from([
            "auction", "--base-url", "http://h/api/", "join", "-s", "s1", "-t", "t1", "--type",
            "decreasing", "--poll-interval-ms", "500",
        ]);
        assert_eq!(cli.backend.base_url.as_deref(), Some("http://h/api/"));
        match cli.command {
            Command::Join {
                session,
                ticket,
                auction_type,
                poll_interval_ms,
                ..
            } => {
                assert_eq!(session, "s1");
                assert_eq!(ticket, "t1");
                assert_eq!(auction_type, AuctionType::Descending);
                assert_eq!(poll_interval_ms, Some(500));
            }
            _ => panic!("expected join"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(Cli::try_parse_from(["auction", "create", "s1", "--type", "sideways"]).is_err());
    }
}
