pub mod auction_state;
pub mod best_bid;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
mod events;
pub mod resolver;
pub mod scheduler;
pub mod submitter;

#[cfg(feature = "native")]
pub mod http_gateway;

#[cfg(test)]
mod testing;
