//! OAuth token cache for authenticated Reddit access.
//!
//! Reddit's "application only" flow exchanges the client id and secret for a
//! short-lived bearer token. [`TokenCache`] performs that exchange lazily and
//! reuses the token until shortly before it expires.
//!
//! # Concurrency
//!
//! The cached state sits behind a `tokio::sync::Mutex` that stays locked for
//! the whole exchange. Callers that arrive while a refresh is in flight wait
//! on the lock and then see the fresh token, so at most one credential
//! exchange is outstanding per cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use feedle_core::HttpConfig;
use feedle_core::error::AppError;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Reddit's token endpoint.
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Client credentials for the Reddit API.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Account name used in the user agent.
    pub username: Option<String>,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Caches a bearer token obtained with the client-credentials grant.
///
/// Cloning is cheap; clones share the cached token.
#[derive(Clone)]
pub struct TokenCache {
    client: Client,
    token_url: String,
    credentials: RedditCredentials,
    user_agent: String,
    timeout: Duration,
    state: Arc<Mutex<Option<CachedToken>>>,
}

impl TokenCache {
    /// Tokens are treated as expired this long before the server says so.
    pub const SAFETY_MARGIN: Duration = Duration::from_secs(60);

    /// Creates a cache for `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(credentials: RedditCredentials, http_config: &HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(http_config.token_timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            token_url: REDDIT_TOKEN_URL.to_string(),
            credentials,
            user_agent: http_config.user_agent.clone(),
            timeout: http_config.token_timeout,
            state: Arc::new(Mutex::new(None)),
        })
    }

    /// Points the cache at a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Returns a bearer token, exchanging credentials if none is cached or
    /// the cached one is inside the safety margin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AuthError` when the endpoint answers with a non-2xx
    /// status or an unreadable body. A failed refresh leaves any previously
    /// cached token in place.
    pub async fn get_token(&self) -> Result<String, AppError> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.as_ref().filter(|t| t.is_valid(Instant::now())) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *state = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token so the next call exchanges credentials again.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    async fn exchange(&self) -> Result<CachedToken, AppError> {
        tracing::debug!(url = %self.token_url, "Requesting access token");

        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout.as_secs())
                } else {
                    AppError::NetworkError(format!("failed to get access token: {}", e))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::AuthError(format!(
                "token request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::AuthError(format!("failed to decode token response: {}", e)))?;

        let ttl = Duration::from_secs(token.expires_in).saturating_sub(Self::SAFETY_MARGIN);
        tracing::debug!(ttl_secs = ttl.as_secs(), "Access token refreshed");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + ttl,
        })
    }
}
