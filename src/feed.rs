//! # Departure Feed Client
//!
//! This module performs the single network operation of a cycle: one HTTP GET
//! against the configured departure monitor, decoded into a [`Feed`].
//!
//! ## Error Handling
//!
//! Two failure kinds, both recoverable by the caller:
//! - **Network**: connection refused, timeout, non-2xx status
//! - **Decode**: body is not JSON or the top level has the wrong shape
//!
//! There are no retries here. The scheduler simply tries again next cycle.

use crate::Feed;
use reqwest::Client;
use serde::de;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP request failed (connection, timeout, or error status)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded into a feed
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can produce one feed per call.
///
/// [`FeedClient`] is the production source; tests drive the scheduler with
/// scripted sources.
pub trait DepartureSource {
    fn fetch(&self) -> impl Future<Output = Result<Feed, FeedError>>;
}

/// HTTP client bound to one feed URL.
pub struct FeedClient {
    client: Client,
    url: String,
}

impl FeedClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "Mozilla/5.0 (departure-board {})",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DepartureSource for FeedClient {
    async fn fetch(&self) -> Result<Feed, FeedError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;

        // text() honours the response charset and replaces invalid sequences
        let body = response.text().await?;
        debug!(bytes = body.len(), "feed body received");

        decode(&body)
    }
}

/// Decode a feed payload.
///
/// The top level must be a JSON object; everything below it is optional.
///
/// # Example
/// ```
/// use departure_board_lib::feed::decode;
///
/// let feed = decode(r#"{"updated":"09:30","events":[{"line":{"number":5}}]}"#).unwrap();
/// assert_eq!(feed.updated, "09:30");
/// assert_eq!(feed.events[0].line_number(), Some("5"));
/// assert!(decode("<html>").is_err());
/// ```
pub fn decode(body: &str) -> Result<Feed, FeedError> {
    let value: Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(FeedError::Decode(de::Error::custom(
            "feed payload is not a JSON object",
        )));
    }
    Ok(serde_json::from_value(value)?)
}
