//! Bearer token handshake for anonymous registry access
//!
//! A registry that wants a token answers `401` with a challenge like
//! `Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull"`.
//! [`AuthManager`] turns that challenge into a token request and keeps the
//! first token it gets for the rest of the client's life.

use crate::error::{FinderError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use url::Url;

const BEARER_SCHEME: &str = "Bearer";

/// Bearer token handed out by a registry token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<{} chars>)", self.0.len())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Parsed `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

impl BearerChallenge {
    /// Parse Bearer challenge: Bearer realm="...",service="...",scope="..."
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        let (scheme, params_str) = header.split_once(' ').unwrap_or((header, ""));

        if scheme != BEARER_SCHEME {
            return Err(FinderError::AuthHeaderMalformed(format!(
                "unsupported auth scheme '{}'",
                scheme
            )));
        }

        let mut params = HashMap::new();
        for param in params_str.split(',') {
            if let Some((key, value)) = param.split_once('=') {
                params.insert(key.trim(), value.trim().trim_matches('"'));
            }
        }

        let realm = params
            .get("realm")
            .filter(|realm| !realm.is_empty())
            .ok_or_else(|| FinderError::AuthHeaderMalformed("no realm in auth header".to_string()))?;

        Ok(Self {
            realm: realm.to_string(),
            service: params.get("service").map(|s| s.to_string()),
            scope: params.get("scope").map(|s| s.to_string()),
        })
    }

    /// Token endpoint URL; a pull scope for `repository` is used when the
    /// challenge names none.
    pub fn token_url(&self, repository: &str) -> Result<Url> {
        let mut url = Url::parse(&self.realm).map_err(|e| {
            FinderError::AuthHeaderMalformed(format!("realm '{}' is not a URL: {}", self.realm, e))
        })?;

        let scope = self
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", repository));

        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &self.service {
                query.append_pair("service", service);
            }
            query.append_pair("scope", &scope);
        }

        Ok(url)
    }
}

/// Lazily acquired, never refreshed token shared by every request of one client
#[derive(Debug)]
pub struct AuthManager {
    client: Client,
    token: Mutex<Option<AuthToken>>,
}

impl AuthManager {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            token: Mutex::new(None),
        }
    }

    /// Currently cached token, if any
    pub fn cached_token(&self) -> Option<AuthToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: AuthToken) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Return the cached token or obtain one from the challenge.
    ///
    /// Workers hitting a 401 at the same time may each fetch a token; the
    /// last write wins and any of them is valid for the same scope.
    pub async fn ensure_token(&self, challenge_header: &str, repository: &str) -> Result<AuthToken> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let challenge = BearerChallenge::parse(challenge_header)?;
        let url = challenge.token_url(repository)?;
        debug!(realm = %challenge.realm, service = ?challenge.service, "requesting bearer token");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FinderError::TokenRequestFailed(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FinderError::TokenRequestFailed(format!(
                "token endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| FinderError::TokenRequestFailed(format!("invalid token response: {}", e)))?;

        let value = body
            .token
            .filter(|t| !t.is_empty())
            .or(body.access_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                FinderError::TokenRequestFailed("response carries neither token nor access_token".to_string())
            })?;

        let token = AuthToken::new(value);
        self.store(token.clone());
        info!(repository, "obtained anonymous bearer token");

        Ok(token)
    }
}
