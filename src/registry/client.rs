// RegistryClient owns the pooled HTTP transport and the token cache that
// every tag listing and manifest lookup of one run goes through.

use crate::config::FinderConfig;
use crate::error::{FinderError, Result};
use crate::registry::auth::{AuthManager, AuthToken};
use reqwest::header::{ACCEPT, HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

const MAX_IDLE_PER_HOST: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub struct RegistryClientBuilder {
    config: FinderConfig,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            config: FinderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.config.validate()?;

        let http = Client::builder()
            .timeout(self.config.timeout)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| FinderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(RegistryClient {
            auth: AuthManager::new(http.clone()),
            http,
        })
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only Docker Registry API v2 client.
///
/// One instance is shared (behind an `Arc`) by every worker of a scan so
/// they reuse connections and the single cached bearer token.
#[derive(Debug)]
pub struct RegistryClient {
    http: Client,
    auth: AuthManager,
}

impl RegistryClient {
    pub fn new(config: &FinderConfig) -> Result<Self> {
        Self::builder().with_config(config.clone()).build()
    }

    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::new()
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn cached_token(&self) -> Option<AuthToken> {
        self.auth.cached_token()
    }

    /// GET `url`, presenting the cached token if there is one.
    ///
    /// A `401` triggers the token handshake against the response challenge
    /// and exactly one retry with the new token. The retried response is
    /// returned whatever its status.
    pub(crate) async fn get_authenticated(
        &self,
        url: &str,
        repository: &str,
        accept: Option<&str>,
    ) -> Result<Response> {
        let response = self.send_get(url, accept, self.cached_token().as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = challenge_header(response.headers())?;
        debug!(url, "registry requested authentication");
        let token = self.auth.ensure_token(&challenge, repository).await?;

        self.send_get(url, accept, Some(&token)).await
    }

    async fn send_get(
        &self,
        url: &str,
        accept: Option<&str>,
        token: Option<&AuthToken>,
    ) -> Result<Response> {
        let mut request = self.http.get(url);

        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.value());
        }

        let response = request.send().await?;
        debug!(url, status = response.status().as_u16(), "registry response");
        Ok(response)
    }
}

fn challenge_header(headers: &HeaderMap) -> Result<String> {
    let value = headers.get(WWW_AUTHENTICATE).ok_or_else(|| {
        FinderError::AuthHeaderMalformed(
            "registry returned 401 without WWW-Authenticate header".to_string(),
        )
    })?;

    value
        .to_str()
        .map(str::to_string)
        .map_err(|e| FinderError::AuthHeaderMalformed(format!("unreadable WWW-Authenticate header: {}", e)))
}
