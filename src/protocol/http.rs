// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP protocol implementation for the matrix switcher REST API.

use std::time::Duration;

use reqwest::Client;

use crate::command::Command;
use crate::error::{Error, ProtocolError};
use crate::state::Snapshot;
use crate::sync::StatusSource;

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration for the switcher's REST API.
///
/// # Examples
///
/// ```
/// use ez_matrix::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.1.100:8000/")
///     .with_poll_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "http://192.168.1.100:8000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    api_url: String,
    poll_timeout: Duration,
}

impl HttpConfig {
    /// Default bound on a `/status` request.
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the given API URL.
    ///
    /// The scheme is optional (`http://` is assumed) and a trailing `/` is
    /// ignored.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Sets the bound on a `/status` request.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Returns the poll timeout.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Builds the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        let url = self.api_url.trim();
        let (scheme, rest) = url.split_once("://").unwrap_or(("http", url));
        format!("{scheme}://{}", rest.trim_end_matches('/'))
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the URL has no host or the HTTP client cannot be
    /// created.
    pub fn into_client(self) -> Result<HttpClient, ProtocolError> {
        let base_url = self.base_url();
        let host = base_url.split_once("://").map_or("", |(_, rest)| rest);
        if host.is_empty() {
            return Err(ProtocolError::InvalidAddress(format!(
                "no host in API URL '{}'",
                self.api_url
            )));
        }

        // Commands use the transport default; only polls are bounded.
        let client = Client::builder().build().map_err(ProtocolError::Http)?;

        Ok(HttpClient {
            base_url,
            client,
            poll_timeout: self.poll_timeout,
        })
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// HTTP client for the matrix switcher.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Examples
///
/// ```no_run
/// use ez_matrix::protocol::HttpClient;
///
/// # async fn example() -> ez_matrix::Result<()> {
/// let client = HttpClient::new("http://192.168.1.100:8000")?;
/// let snapshot = client.fetch_status().await?;
/// println!("cascade mode: {}", snapshot.cascade_mode());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    poll_timeout: Duration,
}

/// Response to a command.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    status: u16,
    body: String,
}

impl CommandResponse {
    /// Returns the HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the raw response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns `true` if the device accepted the command (HTTP 200).
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == 200
    }
}

impl HttpClient {
    /// Creates a client with the default poll timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the URL has no host or the client cannot be created.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ProtocolError> {
        HttpConfig::new(api_url).into_client()
    }

    /// Returns the base URL of the device.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetches the full device state from `GET /status`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Timeout` if the request exceeds the poll
    /// timeout, another `ProtocolError` on transport failure or non-2xx
    /// status, and `ParseError` if the body is not a JSON object.
    pub async fn fetch_status(&self) -> crate::Result<Snapshot> {
        let url = self.url("/status");

        tracing::debug!(url = %url, "Polling device status");

        // Safe: the poll timeout never approaches u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.poll_timeout.as_millis() as u64;

        let body = tokio::time::timeout(self.poll_timeout, self.get_text(&url))
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))??;

        tracing::trace!(body = %body, "Received status");

        Ok(Snapshot::from_json(&body)?)
    }

    async fn get_text(&self, url: &str) -> Result<String, ProtocolError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ProtocolError::UnexpectedStatus(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }

    /// POSTs a command to the device.
    ///
    /// A non-200 answer is not an error here; check
    /// [`CommandResponse::is_accepted`]. An unreadable body is logged and
    /// left empty, the status still decides the outcome.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Http` if the request cannot be sent.
    pub async fn send_command<C: Command + Sync>(
        &self,
        command: &C,
    ) -> Result<CommandResponse, ProtocolError> {
        let url = self.url(command.path());

        tracing::debug!(url = %url, "Sending command");

        let response = self.client.post(&url).json(command).send().await?;
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status, error = %e, "Failed to read command response body");
                String::new()
            }
        };

        tracing::debug!(status, body = %body, "Received command response");

        Ok(CommandResponse { status, body })
    }
}

impl StatusSource for HttpClient {
    async fn fetch(&self) -> Result<Snapshot, Error> {
        self.fetch_status().await
    }
}
