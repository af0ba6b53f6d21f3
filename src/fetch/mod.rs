//! Conditional HTTP fetch of the warning feed.

mod basic;
mod client;
#[cfg(test)]
pub(crate) mod testing;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feed::AlertBulletin;
use crate::parser::parse_feed;

/// HTTP cache validators from the last full response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheValidators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheValidators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }

    fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            etag: read(ETAG),
            last_modified: read(LAST_MODIFIED),
        }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(value) = self
            .last_modified
            .as_deref()
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(IF_MODIFIED_SINCE, value);
        }
    }
}

/// Result of a successful conditional fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 304; the previous payload is still current.
    NotModified,
    /// A fresh payload with the validators that came with it.
    Payload {
        feed: Vec<AlertBulletin>,
        validators: CacheValidators,
    },
}

enum Exchange {
    NotModified,
    Status(StatusCode),
    Body(CacheValidators, Vec<u8>),
}

/// Issues conditional GETs against one feed URL.
///
/// No retries happen here; the coordinator decides when to try again.
pub struct FeedFetcher<C> {
    client: C,
    url: String,
    timeout: Duration,
}

impl<C: HttpClient> FeedFetcher<C> {
    pub fn new(client: C, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the feed, sending `validators` as conditional headers.
    ///
    /// # Errors
    ///
    /// [`FetchError::Communication`] for transport failures, timeouts and
    /// unexpected statuses; [`FetchError::InvalidResponse`] when the body
    /// does not decode.
    #[tracing::instrument(skip(self, validators), fields(url = %self.url))]
    pub async fn fetch(&self, validators: &CacheValidators) -> Result<FetchOutcome, FetchError> {
        let url = self
            .url
            .parse()
            .map_err(|e| FetchError::Communication(format!("invalid feed url: {e}")))?;
        let mut req = reqwest::Request::new(reqwest::Method::GET, url);
        validators.apply(req.headers_mut());
        debug!(conditional = !validators.is_empty(), "Requesting feed");

        let exchange = tokio::time::timeout(self.timeout, self.exchange(req))
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Feed request timed out");
                FetchError::Communication("request timed out".to_string())
            })?
            .map_err(|e| {
                warn!(error = %e, "Feed request failed");
                FetchError::Communication(e.to_string())
            })?;

        match exchange {
            Exchange::NotModified => {
                debug!("Feed not modified");
                Ok(FetchOutcome::NotModified)
            }
            Exchange::Status(status) => {
                warn!(%status, "Feed returned unexpected status");
                Err(FetchError::Communication(format!("unexpected status {status}")))
            }
            Exchange::Body(validators, body) => {
                debug!(bytes = body.len(), etag = ?validators.etag, "Feed body received");
                let feed = parse_feed(&body)?;
                Ok(FetchOutcome::Payload { feed, validators })
            }
        }
    }

    async fn exchange(&self, req: reqwest::Request) -> reqwest::Result<Exchange> {
        let resp = self.client.execute(req).await?;
        let status = resp.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(Exchange::NotModified);
        }
        if !status.is_success() {
            return Ok(Exchange::Status(status));
        }

        let validators = CacheValidators::from_headers(resp.headers());
        let body = resp.bytes().await?;
        Ok(Exchange::Body(validators, body.to_vec()))
    }
}
