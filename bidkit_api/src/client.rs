//! HTTP client for the auction backend.

use std::time::Duration;

use url::Url;

use crate::{request::BidRequest, types::BidResponse, user_agent::get_user_agent, Error};

/// Production auction endpoint.
const DEFAULT_BASE_URL: &str = "https://bidder.bidkit.io";

/// Path of the in-app auction call, relative to the base URL.
const BID_PATH: &str = "/inapp/v2";

/// Default request timeout. Live callers race their own, shorter, budget on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the auction backend.
///
/// Holds one pooled `reqwest::Client` reused across calls.
pub struct Client {
    /// Base URL for the API. Defaults to `https://bidder.bidkit.io`.
    base_api_url: String,
    http: reqwest::Client,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a new client pointing at the production auction endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Creates a new client with a custom base URL and request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_api_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn get_url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })
    }

    /// Runs one auction for every slot in `request`.
    ///
    /// A 204 is a valid "nothing to bid" answer and maps to an empty response.
    pub async fn fetch_bids(&self, request: &BidRequest) -> Result<BidResponse, Error> {
        let url = self.get_url(BID_PATH)?;
        let resp = self
            .http
            .post(url)
            .header("accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send bid request: {}", e);
                Error::RequestFailed
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(BidResponse::default());
        }

        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Bid request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<BidResponse>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse bid response: {} | body: {}", e, snippet);
            Error::MalformedPayload(e.to_string())
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn truncate_cuts_long_bodies_on_char_boundary() {
        let body = "é".repeat(1500);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
        assert!(out.len() <= 2000 + "...[truncated]".len());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = Client::with_base_url("http://localhost:1234/");
        let url = client.get_url(BID_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/inapp/v2");
    }
}
