//! HTTP client for the stats service
//!
//! Provides a single-attempt JSON GET with:
//! - Browser-like default headers (the service rejects bare clients)
//! - Bounded connect and request timeouts
//! - Optional shared rate limiter consulted before every request
//! - Status classification into [`FetcherError`]

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::collector::rate_limit::RateLimiter;
use crate::fetcher::{FetcherError, FetcherResult};

/// Time allowed to establish the TCP/TLS connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the whole request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headers the stats service expects from a browser session
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
    headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));
    headers
}

/// JSON-over-HTTP client for one stats service host
pub struct StatsHttpClient {
    client: Client,
    base_url: String,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl StatsHttpClient {
    /// Build a client with default headers and the given request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .default_headers(default_headers())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetcherError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: None,
        }
    }

    /// Gate every request on a shared rate limiter
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one GET and decode the body as JSON
    ///
    /// # Errors
    /// - [`FetcherError::Timeout`] when the request exceeds the timeout
    /// - [`FetcherError::RateLimitExceeded`] on HTTP 429
    /// - [`FetcherError::HttpStatus`] on any other non-2xx status
    /// - [`FetcherError::ParseError`] when the body is not JSON
    pub async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);

        if let Some(limiter) = &self.rate_limiter {
            limiter
                .acquire(1)
                .await
                .map_err(|e| FetcherError::NetworkError(format!("Rate limiter error: {e}")))?;
        }

        debug!(url = %url, params = params.len(), "Sending GET request");
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        crate::metrics::record_http_request(endpoint, status.as_u16(), started.elapsed());

        if status.as_u16() == 429 {
            warn!(url = %url, "Rate limited by stats service (429)");
            return Err(FetcherError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(url = %url, status = status.as_u16(), "Stats service returned error status");
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                message: truncate(&body, 200),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetcherError::Timeout(e.to_string())
            } else {
                FetcherError::ParseError(format!("Failed to decode response: {e}"))
            }
        })
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetcherError {
    if err.is_timeout() {
        FetcherError::Timeout(err.to_string())
    } else {
        FetcherError::NetworkError(err.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
