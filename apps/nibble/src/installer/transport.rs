//! Release host transport.
//!
//! The pipeline talks to the release host through the [`Transport`] trait so
//! the orchestration can be exercised without a network. [`HttpTransport`] is
//! the production implementation: a blocking `reqwest` client that streams
//! response bodies straight into the destination file.
//!
//! Only HTTP 404 means "not found" and lets the caller move on to the next
//! candidate. Any other failure is a hard [`NibbleError::Transport`] and is
//! never retried.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};

use crate::errors::NibbleError;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// User agent sent with every request.
const USER_AGENT: &str = "nibble-installer";

/// Fetches release files by URL.
pub trait Transport {
    /// Downloads `url` into `dest`.
    ///
    /// Returns `Ok(false)` if the host reports the file as not found, in
    /// which case `dest` is not created.
    ///
    /// # Errors
    ///
    /// Returns an error on any other network failure or if `dest` cannot be
    /// written.
    fn download(&self, url: &str, dest: &Path) -> Result<bool>;

    /// Fetches `url` as text. Returns `Ok(None)` if it is not found.
    ///
    /// # Errors
    ///
    /// Returns an error on any other network failure.
    fn fetch_text(&self, url: &str) -> Result<Option<String>>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Creates a transport with a specific request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Sends a GET request, mapping 404 to `None` and other failures to errors.
    fn get(&self, url: &str) -> Result<Option<Response>> {
        tracing::debug!(url, "GET");
        let response = self.client.get(url).send().map_err(|e| {
            NibbleError::transport_with_source(format!("failed to fetch {url}"), Box::new(e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(url, "not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(NibbleError::transport(format!("HTTP {status} fetching {url}")).into());
        }
        Ok(Some(response))
    }
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, dest: &Path) -> Result<bool> {
        let Some(mut response) = self.get(url)? else {
            return Ok(false);
        };

        let mut file = File::create(dest)
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;
        let written = response.copy_to(&mut file).map_err(|e| {
            NibbleError::transport_with_source(format!("failed to read body of {url}"), Box::new(e))
        })?;
        tracing::debug!(url, bytes = written, "downloaded");
        Ok(true)
    }

    fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let Some(response) = self.get(url)? else {
            return Ok(None);
        };

        let text = response.text().map_err(|e| {
            NibbleError::transport_with_source(format!("failed to read body of {url}"), Box::new(e))
        })?;
        Ok(Some(text))
    }
}

/// Tries `candidates` in order until `fetch` yields a value.
///
/// Returns the winning candidate together with its value, or `None` if every
/// candidate was not found. The first hard error stops the search.
///
/// # Errors
///
/// Propagates the first error returned by `fetch`.
pub fn try_in_order<'c, C, T, F>(candidates: &'c [C], mut fetch: F) -> Result<Option<(&'c C, T)>>
where
    F: FnMut(&C) -> Result<Option<T>>,
{
    for candidate in candidates {
        if let Some(value) = fetch(candidate)? {
            return Ok(Some((candidate, value)));
        }
    }
    Ok(None)
}
