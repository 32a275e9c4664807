//! reqwest implementation of [`BackendGateway`].
//!
//! All paths come from [`auction_core::gateway::paths`] and are appended to
//! the configured base URL. Non-success responses are turned into
//! [`GatewayError::Status`], carrying the `message` field of the backend's
//! JSON error body when there is one.

use std::sync::Arc;

use auction_core::gateway::{BackendGateway, GatewayError, GatewayResult, paths};
use auction_core::protocol::{
    AuctionType, BestBid, CandidateBid, PlacedBid, RemainingTimeResponse, SessionSummary,
    WinnerResponse,
};
use futures_util::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::ClientConfig;

/// Backend error payload. Only `message` is used.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Arc<str>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> GatewayResult<Self> {
        let base_url = config.base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidBaseUrl {
                url: config.base_url.clone(),
            });
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| GatewayError::Transport {
                path: base_url.to_string(),
                message: source.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(path: &str, builder: RequestBuilder) -> GatewayResult<Response> {
        debug!(path, "backend request");
        builder
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                path: path.to_string(),
                message: source.to_string(),
            })
    }

    /// Send and require a success status.
    async fn send_checked(path: &str, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = Self::send(path, builder).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(path, response).await)
        }
    }

    async fn get_json<T>(&self, path: String) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        let response = Self::send_checked(&path, self.request(Method::GET, &path)).await?;
        decode(&path, response).await
    }

    async fn post_empty(&self, path: String) -> GatewayResult<()> {
        let builder = self
            .request(Method::POST, &path)
            .json(&serde_json::json!({}));
        Self::send_checked(&path, builder).await.map(|_| ())
    }
}

async fn status_error(path: &str, response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty());
    GatewayError::Status {
        path: path.to_string(),
        status,
        message,
    }
}

async fn decode<T>(path: &str, response: Response) -> GatewayResult<T>
where
    T: DeserializeOwned,
{
    response
        .json::<T>()
        .await
        .map_err(|source| GatewayError::Decode {
            path: path.to_string(),
            message: source.to_string(),
        })
}

impl BackendGateway for HttpGateway {
    fn activate_session(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        let path = paths::activate(auction_type, session_id);
        Box::pin(async move { gateway.post_empty(path).await })
    }

    fn stop_session(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        let path = paths::stop(auction_type, session_id);
        Box::pin(async move { gateway.post_empty(path).await })
    }

    fn session_status(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<SessionSummary>> {
        let gateway = self.clone();
        let path = paths::status(auction_type, session_id);
        Box::pin(async move { gateway.get_json(path).await })
    }

    fn active_sessions(
        &self,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Vec<SessionSummary>>> {
        let gateway = self.clone();
        let path = paths::active_sessions(auction_type);
        Box::pin(async move { gateway.get_json(path).await })
    }

    fn place_bid(
        &self,
        session_id: &str,
        auction_type: AuctionType,
        bid: &CandidateBid,
    ) -> BoxFuture<'static, GatewayResult<PlacedBid>> {
        let gateway = self.clone();
        let path = paths::place(auction_type, session_id);
        let bid = bid.clone();
        Box::pin(async move {
            let builder = gateway.request(Method::POST, &path).json(&bid);
            let response = Self::send_checked(&path, builder).await?;
            decode(&path, response).await
        })
    }

    fn best_bid(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<Option<BestBid>>> {
        let gateway = self.clone();
        let path = paths::best_bid(auction_type, session_id);
        Box::pin(async move {
            let response = Self::send(&path, gateway.request(Method::GET, &path)).await?;
            match response.status() {
                StatusCode::NO_CONTENT => return Ok(None),
                status if status.is_success() => {}
                _ => return Err(status_error(&path, response).await),
            }
            let body = response
                .text()
                .await
                .map_err(|source| GatewayError::Transport {
                    path: path.clone(),
                    message: source.to_string(),
                })?;
            // No bids yet is reported as an empty body or `null`.
            serde_json::from_str::<Option<BestBid>>(body.trim())
                .or_else(|err| {
                    if body.trim().is_empty() {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                })
                .map_err(|source| GatewayError::Decode {
                    path,
                    message: source.to_string(),
                })
        })
    }

    fn winner(
        &self,
        session_id: &str,
        auction_type: AuctionType,
    ) -> BoxFuture<'static, GatewayResult<WinnerResponse>> {
        let gateway = self.clone();
        let path = paths::winner(auction_type, session_id);
        Box::pin(async move { gateway.get_json(path).await })
    }

    fn remaining_time(
        &self,
        session_id: &str,
    ) -> BoxFuture<'static, GatewayResult<RemainingTimeResponse>> {
        let gateway = self.clone();
        let path = paths::remaining_time(session_id);
        Box::pin(async move { gateway.get_json(path).await })
    }
}
