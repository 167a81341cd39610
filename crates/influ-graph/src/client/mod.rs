//! HTTP client for the versioned Graph API.
//!
//! Wraps `reqwest` with Graph-specific URL building, token redaction in
//! errors and logs, and typed response decoding. No retries are performed:
//! the API enforces per-token call quotas and a failed call is surfaced to the
//! caller instead of being re-issued.

mod account;

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::GraphError;

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v7.0/";

/// Client for the Graph API.
///
/// Use [`GraphClient::new`] for production or [`GraphClient::with_base_url`]
/// to point at a mock server in tests. The request timeout doubles as the
/// per-page timeout of every crawl.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    base_url: Url,
}

impl GraphClient {
    /// Creates a client pointed at the production Graph API.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, GraphError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs, user_agent)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`GraphError::InvalidUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends the account path
        // instead of replacing the version segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GraphError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}{path}?{params}&access_token={token}` with every value
    /// percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUrl`] if `path` cannot be joined onto the
    /// base URL.
    pub fn endpoint(
        &self,
        path: &str,
        params: &[(&str, &str)],
        access_token: &str,
    ) -> Result<Url, GraphError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GraphError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("access_token", access_token);
        }
        Ok(url)
    }

    /// Sends a GET request, asserts a 2xx status, and decodes the body.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Http`] on network failure or timeout.
    /// - [`GraphError::UnexpectedStatus`] on any non-2xx status.
    /// - [`GraphError::Deserialize`] if the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, GraphError> {
        tracing::debug!(url = %redact_token(url), context, "graph request");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GraphError::UnexpectedStatus {
                status: status.as_u16(),
                url: redact_token(url),
                message: graph_error_message(&body)
                    .unwrap_or_else(|| "no error message".to_owned()),
            });
        }

        serde_json::from_str(&body).map_err(|e| GraphError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

/// Renders `url` with the `access_token` query value masked.
#[must_use]
pub fn redact_token(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }

    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" {
                "[redacted]".to_owned()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Extracts `error.message` from a Graph error body.
fn graph_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
