//! Source client enum dispatch and registry construction.
//!
//! [`SourceClient`] returns `impl Future` from its methods, so it cannot be
//! used as `dyn SourceClient`. [`SourceClientEnum`] wraps every concrete
//! client instead and dispatches statically.

use feedle_core::error::FetchError;
use feedle_core::models::{FetchConfig, NormalizedRecord};
use feedle_core::registry::SourceRegistry;
use feedle_core::traits::SourceClient;
use feedle_core::{AppError, HttpConfig, SourceKind};
use tokio_util::sync::CancellationToken;

use crate::reddit::RedditClient;
use crate::token::{RedditCredentials, TokenCache};

/// Unified source client wrapping the concrete implementations.
#[derive(Clone)]
pub enum SourceClientEnum {
    /// Reddit JSON API client.
    Reddit(RedditClient),
}

impl SourceClient for SourceClientEnum {
    fn source(&self) -> SourceKind {
        match self {
            Self::Reddit(c) => c.source(),
        }
    }

    async fn fetch(
        &self,
        config: &FetchConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        match self {
            Self::Reddit(c) => c.fetch(config, cancel).await,
        }
    }
}

impl From<RedditClient> for SourceClientEnum {
    fn from(client: RedditClient) -> Self {
        Self::Reddit(client)
    }
}

/// Builds the registry of every source with a client implementation.
///
/// With `credentials`, the Reddit client authenticates through a
/// [`TokenCache`]; without them it uses the public endpoints.
///
/// # Errors
///
/// Returns `AppError::ClientError` if an HTTP client cannot be built.
pub fn build_registry(
    http_config: &HttpConfig,
    credentials: Option<RedditCredentials>,
) -> Result<SourceRegistry<SourceClientEnum>, AppError> {
    let auth = credentials
        .map(|creds| TokenCache::new(creds, http_config))
        .transpose()?;

    if auth.is_none() {
        tracing::debug!("No Reddit credentials configured, using public endpoints");
    }

    let reddit = RedditClient::new(http_config, auth)?;
    Ok(SourceRegistry::new().with(SourceClientEnum::from(reddit)))
}
