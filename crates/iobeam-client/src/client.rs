//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use url::Url;

use crate::error::{Error, Result};
use crate::request::Request;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent: `iobeam cli <version>-<os>-<arch>`.
pub fn default_user_agent() -> String {
    format!(
        "iobeam cli {}-{}-{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Blocking iobeam API client.
///
/// One client is built per invocation and reused for every request it makes,
/// e.g. an app start followed by status polls.
///
/// # Example
///
/// ```no_run
/// use iobeam_client::Client;
///
/// # fn example() -> iobeam_client::Result<()> {
/// let client = Client::builder()
///     .base_url("https://api.iobeam.com")
///     .build()?;
///
/// let me: serde_json::Value = client.get("/v1/users/me").expect(200).fetch()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .finish()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::blocking::Client {
        &self.inner.http
    }

    /// Full URL for an API path such as `/v1/devices`.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.inner.base_url, path))?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a GET request.
    pub fn get(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::GET, path.into())
    }

    /// Start a POST request.
    pub fn post(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::POST, path.into())
    }

    /// Start a PUT request.
    pub fn put(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::PUT, path.into())
    }

    /// Start a PATCH request.
    pub fn patch(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::PATCH, path.into())
    }

    /// Start a DELETE request.
    pub fn delete(&self, path: impl Into<String>) -> Request<'_> {
        Request::new(self, Method::DELETE, path.into())
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the API server, e.g. `https://api.iobeam.com`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Builder("base_url is required".to_string()))?;

        // Validate, then keep the textual form so paths append verbatim.
        Url::parse(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let http = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.unwrap_or_else(default_user_agent))
            .timeout(self.timeout)
            .build()?;

        Ok(Client {
            inner: Arc::new(ClientInner { http, base_url }),
        })
    }
}
