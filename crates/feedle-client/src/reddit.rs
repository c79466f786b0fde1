//! Reddit client for fetching posts as normalized records.
//!
//! Two retrieval modes are supported:
//!
//! - **Listing**: without keywords, a single page of `/r/{subreddit}.json`.
//! - **Search**: for every keyword, a paginated `search.json` query that
//!   follows the `after` cursor until the page cap or the result limit is
//!   reached.
//!
//! Reddit API reference: <https://www.reddit.com/dev/api/>
//!
//! # Errors and retries
//!
//! Non-200 responses are mapped to [`AppError`] variants and never retried
//! here. A failing keyword is logged and skipped; the other keywords still
//! run.

use std::collections::HashSet;
use std::time::Duration;

use chrono::DateTime;
use feedle_core::error::{AppError, FetchError};
use feedle_core::models::{FetchConfig, FetchConfigDetail, NormalizedRecord, RedditOptions};
use feedle_core::traits::SourceClient;
use feedle_core::{HttpConfig, SourceKind};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::token::TokenCache;

/// Base URL for unauthenticated requests.
pub const PUBLIC_BASE_URL: &str = "https://www.reddit.com";

/// Base URL for requests carrying a bearer token.
pub const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";

const PUBLIC_HOST: &str = "www.reddit.com";
const OAUTH_HOST: &str = "oauth.reddit.com";

/// Top-level listing response.
#[derive(Deserialize, Debug)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize, Debug, Default)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

/// A listing child. Only `t3` (link) things are posts.
#[derive(Deserialize, Debug)]
struct Thing {
    kind: String,
    #[serde(default)]
    data: Option<RedditPost>,
}

/// Post fields used for normalization.
///
/// # Examples
///
/// ```
/// use feedle_client::reddit::RedditPost;
///
/// let json = r#"{
///     "id": "abc123",
///     "title": "Hello",
///     "permalink": "/r/rust/comments/abc123/hello/",
///     "subreddit": "rust",
///     "author": "ferris",
///     "score": 42
/// }"#;
///
/// let post: RedditPost = serde_json::from_str(json).unwrap();
/// assert_eq!(post.id, "abc123");
/// assert!(!post.over_18);
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RedditPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_fullname: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub over_18: bool,
}

/// Parameters of one search request.
#[derive(Debug, Clone)]
struct SearchParams<'a> {
    query: &'a str,
    subreddit: Option<&'a str>,
    limit: usize,
    after: Option<String>,
    sort: &'a str,
    time_filter: Option<&'a str>,
}

/// HTTP client for the Reddit JSON API.
///
/// # Examples
///
/// ```no_run
/// use feedle_client::RedditClient;
/// use feedle_core::{FetchConfig, HttpConfig};
/// use feedle_core::traits::SourceClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedditClient::new(&HttpConfig::default(), None)?;
/// let config = FetchConfig::reddit(Some("rust")).with_limit(10);
/// let records = client.fetch(&config, CancellationToken::new()).await?;
/// println!("Fetched {} posts", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    base_url: Url,
    user_agent: String,
    request_delay: Duration,
    timeout: Duration,
    auth: Option<TokenCache>,
}

impl RedditClient {
    /// Maximum number of results Reddit returns per page.
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Used when the configured limit is zero or above the page cap.
    pub const DEFAULT_LIMIT: usize = 100;

    const DEFAULT_SORT: &'static str = "relevance";
    const DEFAULT_TIME_FILTER: &'static str = "all";

    /// Creates a client. With `auth`, requests go to the OAuth host and carry
    /// a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(http_config: &HttpConfig, auth: Option<TokenCache>) -> Result<Self, AppError> {
        let base = if auth.is_some() {
            OAUTH_BASE_URL
        } else {
            PUBLIC_BASE_URL
        };
        let base_url = Url::parse(base).map_err(|_| AppError::InvalidUrl(base.to_string()))?;

        let client = Client::builder()
            .user_agent(&http_config.user_agent)
            .timeout(http_config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            user_agent: http_config.user_agent.clone(),
            request_delay: http_config.request_delay,
            timeout: http_config.timeout,
            auth,
        })
    }

    /// Overrides the API base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if `base_url` does not parse.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, AppError> {
        self.base_url =
            Url::parse(base_url).map_err(|_| AppError::InvalidUrl(base_url.to_string()))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Clamps a requested limit to `1..=MAX_PAGE_SIZE`, using the default
    /// for zero and out-of-range values.
    pub fn effective_limit(limit: usize) -> usize {
        if limit == 0 || limit > Self::MAX_PAGE_SIZE {
            Self::DEFAULT_LIMIT
        } else {
            limit
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn listing_url(&self, subreddit: &str, limit: usize) -> Result<Url, AppError> {
        let mut url = self.endpoint(&format!("r/{}.json", subreddit))?;
        url.query_pairs_mut()
            .append_pair("limit", &Self::effective_limit(limit).to_string());
        Ok(url)
    }

    fn search_url(&self, params: &SearchParams<'_>) -> Result<Url, AppError> {
        let path = match params.subreddit {
            Some(subreddit) => format!("r/{}/search.json", subreddit),
            None => "search.json".to_string(),
        };
        let mut url = self.endpoint(&path)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", params.query)
                .append_pair("limit", &Self::effective_limit(params.limit).to_string());
            if let Some(after) = params.after.as_deref() {
                pairs.append_pair("after", after);
            }
            pairs.append_pair("sort", params.sort);
            if matches!(params.sort, "top" | "controversial") {
                pairs.append_pair(
                    "t",
                    params.time_filter.unwrap_or(Self::DEFAULT_TIME_FILTER),
                );
            }
            if params.subreddit.is_some() {
                pairs.append_pair("restrict_sr", "true");
            }
            pairs.append_pair("include_over_18", "true");
        }

        Ok(url)
    }

    /// Rewrites a public-host URL to the OAuth host.
    fn to_oauth_url(mut url: Url) -> Url {
        if url.host_str() == Some(PUBLIC_HOST) {
            // Only fails for cannot-be-a-base URLs, which http(s) URLs never are.
            let _ = url.set_host(Some(OAUTH_HOST));
        }
        url
    }

    /// Fetches one page and returns its posts and the next cursor.
    async fn fetch_page(
        &self,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<(Vec<NormalizedRecord>, Option<String>), AppError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.request_page(url) => result,
        }
    }

    async fn request_page(
        &self,
        url: Url,
    ) -> Result<(Vec<NormalizedRecord>, Option<String>), AppError> {
        let mut request_url = url;
        let mut bearer = None;
        if let Some(auth) = &self.auth {
            bearer = Some(auth.get_token().await?);
            request_url = Self::to_oauth_url(request_url);
        }

        if !self.request_delay.is_zero() {
            sleep(self.request_delay).await;
        }

        tracing::debug!(url = %request_url, "GET");

        let mut request = self
            .client
            .get(request_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {}", e))
            } else {
                AppError::ClientError(e.to_string())
            }
        })?;

        if resp.status() != StatusCode::OK {
            // A rejected token is dropped so the next request exchanges again.
            if resp.status() == StatusCode::UNAUTHORIZED {
                if let Some(auth) = &self.auth {
                    auth.invalidate().await;
                }
            }
            return Err(Self::error_from_response(resp).await);
        }

        let listing: Listing = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("failed to decode Reddit response: {}", e)))?;

        let after = listing.data.after.filter(|a| !a.is_empty());
        let records = listing
            .data
            .children
            .into_iter()
            .filter_map(Self::into_record)
            .collect();

        Ok((records, after))
    }

    /// Maps a non-200 response to an error.
    ///
    /// A JSON body with a `message` field wins over the status code.
    async fn error_from_response(resp: reqwest::Response) -> AppError {
        let status = resp.status();
        let reset = resp
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let message = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
        if let Some(message) = message {
            return AppError::ApiError {
                status: status.as_u16(),
                message,
            };
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitExceeded { reset },
            StatusCode::UNAUTHORIZED => AppError::AuthError("authentication failed".to_string()),
            StatusCode::FORBIDDEN => {
                AppError::Forbidden("access forbidden - check permissions".to_string())
            }
            other => AppError::HttpStatus(other.as_u16()),
        }
    }

    /// Single page of a subreddit listing.
    async fn fetch_listing(
        &self,
        subreddit: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        let url = self.listing_url(subreddit, limit)?;
        let (records, _) = self.fetch_page(url, cancel).await?;
        Ok(records)
    }

    /// Follows the `after` cursor for one keyword.
    ///
    /// Stops when the cursor is empty or `limit` records are collected, and
    /// trims the last page so no more than `limit` come back. On failure the
    /// pages collected so far travel with the error.
    async fn search_keyword(
        &self,
        mut params: SearchParams<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        let limit = Self::effective_limit(params.limit);
        let mut collected = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::new(AppError::Cancelled, collected));
            }

            let url = match self.search_url(&params) {
                Ok(url) => url,
                Err(e) => return Err(FetchError::new(e, collected)),
            };

            let (records, after) = match self.fetch_page(url, cancel).await {
                Ok(page) => page,
                Err(e) => return Err(FetchError::new(e, collected)),
            };
            collected.extend(records);

            match after {
                Some(cursor) if collected.len() < limit => params.after = Some(cursor),
                _ => break,
            }
        }

        collected.truncate(limit);
        Ok(collected)
    }

    /// Converts a listing child into a record.
    ///
    /// Returns `None` for non-post things and children without data.
    fn into_record(thing: Thing) -> Option<NormalizedRecord> {
        if thing.kind != "t3" {
            return None;
        }
        thing.data.map(Self::post_to_record)
    }

    /// Converts a Reddit post into a [`NormalizedRecord`].
    ///
    /// The record id is a UUIDv5 of `reddit:{post id}`, so repeated fetches
    /// of the same post yield the same id.
    pub fn post_to_record(post: RedditPost) -> NormalizedRecord {
        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("reddit:{}", post.id).as_bytes(),
        );

        let mut metadata = Map::new();
        metadata.insert("score".to_string(), Value::from(post.score));
        metadata.insert("num_comments".to_string(), Value::from(post.num_comments));
        metadata.insert("subreddit".to_string(), Value::from(post.subreddit.clone()));
        metadata.insert("permalink".to_string(), Value::from(post.permalink.clone()));
        metadata.insert("over_18".to_string(), Value::from(post.over_18));

        let mut media_urls = Vec::new();
        if !post.url.is_empty() && !post.url.starts_with(PUBLIC_BASE_URL) {
            media_urls.push(post.url.clone());
        }

        let mut tags = vec![
            format!("subreddit:{}", post.subreddit),
            format!("author:{}", post.author),
        ];
        if post.over_18 {
            tags.push("nsfw".to_string());
        }

        let mut record = NormalizedRecord::new(SourceKind::Reddit.as_str(), post.title)
            .with_tags(tags);
        record.id = Some(id);
        record.source_item_id = Some(post.id);
        record.content = Some(post.selftext).filter(|s| !s.is_empty());
        record.url = Some(format!("https://reddit.com{}", post.permalink));
        record.author_name = Some(post.author).filter(|a| !a.is_empty());
        record.author_id = post.author_fullname.filter(|a| !a.is_empty());
        record.published_at = DateTime::from_timestamp(post.created_utc as i64, 0);
        record.metadata = metadata;
        record.media_urls = media_urls;
        record
    }

    /// Keeps the first record for every id, preserving order.
    fn dedup_records(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|r| match r.id {
                Some(id) => seen.insert(id),
                None => false,
            })
            .collect()
    }

    async fn fetch_reddit(
        &self,
        config: &FetchConfig,
        opts: &RedditOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        let subreddit = opts.subreddit.as_deref().filter(|s| !s.trim().is_empty());

        if config.keywords.is_empty() {
            // validate() guarantees a subreddit here
            let Some(subreddit) = subreddit else {
                return Err(AppError::NoQueryCriteria.into());
            };
            let records = self.fetch_listing(subreddit, config.limit, cancel).await?;
            tracing::debug!(subreddit, count = records.len(), "Listing fetched");
            return Ok(Self::dedup_records(records));
        }

        let sort = opts
            .sort
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(Self::DEFAULT_SORT);

        let mut all = Vec::new();
        for keyword in &config.keywords {
            let params = SearchParams {
                query: keyword,
                subreddit,
                limit: config.limit,
                after: None,
                sort,
                time_filter: opts.time_filter.as_deref().filter(|t| !t.is_empty()),
            };

            match self.search_keyword(params, cancel).await {
                Ok(records) => {
                    tracing::debug!(keyword = %keyword, count = records.len(), "Keyword search finished");
                    all.extend(records);
                }
                Err(e) if e.error.is_cancelled() => {
                    all.extend(e.partial);
                    return Err(FetchError::new(
                        AppError::Cancelled,
                        Self::dedup_records(all),
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        keyword = %keyword,
                        error = %e.error,
                        discarded = e.partial.len(),
                        "Keyword search failed, continuing"
                    );
                }
            }
        }

        Ok(Self::dedup_records(all))
    }
}

impl SourceClient for RedditClient {
    fn source(&self) -> SourceKind {
        SourceKind::Reddit
    }

    async fn fetch(
        &self,
        config: &FetchConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<NormalizedRecord>, FetchError> {
        config.validate()?;

        let FetchConfigDetail::Reddit(opts) = &config.detail else {
            return Err(AppError::ConfigError(format!(
                "reddit client cannot handle a {} fetch config",
                config.source_kind()
            ))
            .into());
        };

        self.fetch_reddit(config, opts, &cancel).await
    }
}
