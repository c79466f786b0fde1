//! Domain models shared by every crate in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::SourceKind;
use crate::error::AppError;

/// The canonical unit produced by source clients and persisted by the store.
///
/// # Examples
///
/// ```
/// use feedle_core::models::NormalizedRecord;
///
/// let record = NormalizedRecord::new("reddit", "Hello")
///     .with_tags(["subreddit:rust", "author:ferris", "subreddit:rust"]);
///
/// assert_eq!(record.tags, vec!["subreddit:rust", "author:ferris"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable identifier. `None` leaves assignment to the store.
    pub id: Option<Uuid>,
    /// Owning fetch configuration, stamped by the orchestrator.
    pub config_id: Option<Uuid>,
    pub source: String,
    /// The source's own identifier for the item.
    pub source_item_id: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub author_name: Option<String>,
    pub author_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Engagement counters and other scalar attributes.
    pub metadata: Map<String, Value>,
    pub media_urls: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl NormalizedRecord {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            config_id: None,
            source: source.into(),
            source_item_id: None,
            title: title.into(),
            content: None,
            url: None,
            author_name: None,
            author_id: None,
            published_at: None,
            tags: Vec::new(),
            metadata: Map::new(),
            media_urls: Vec::new(),
            fetched_at: None,
        }
    }

    /// Appends tags, skipping any already present.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for tag in tags {
            self.push_tag(tag);
        }
        self
    }

    pub fn push_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Canonical URL, if present and non-empty.
    pub fn canonical_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// Source-native id, if present and non-empty.
    pub fn native_id(&self) -> Option<&str> {
        self.source_item_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Engagement score, when the source reports one.
    pub fn score(&self) -> Option<i64> {
        self.metadata.get("score").and_then(Value::as_i64)
    }
}

/// Reddit-specific fetch options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedditOptions {
    pub subreddit: Option<String>,
    /// relevance, hot, top, new, comments
    pub sort: Option<String>,
    /// hour, day, week, month, year, all
    pub time_filter: Option<String>,
}

/// YouTube-specific fetch options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouTubeOptions {
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
    pub order: String,
}

impl YouTubeOptions {
    pub const DEFAULT_ORDER: &'static str = "relevance";
    pub const DEFAULT_MAX_RESULTS: usize = 50;
}

impl Default for YouTubeOptions {
    fn default() -> Self {
        Self {
            channel_id: None,
            playlist_id: None,
            order: Self::DEFAULT_ORDER.to_string(),
        }
    }
}

/// Source-specific part of a [`FetchConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FetchConfigDetail {
    Reddit(RedditOptions),
    YouTube(YouTubeOptions),
}

impl FetchConfigDetail {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            FetchConfigDetail::Reddit(_) => SourceKind::Reddit,
            FetchConfigDetail::YouTube(_) => SourceKind::YouTube,
        }
    }

    /// The channel-like target of the fetch (subreddit, channel or playlist).
    pub fn channel(&self) -> Option<&str> {
        let channel = match self {
            FetchConfigDetail::Reddit(opts) => opts.subreddit.as_deref(),
            FetchConfigDetail::YouTube(opts) => opts
                .channel_id
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .or(opts.playlist_id.as_deref()),
        };
        channel.filter(|c| !c.trim().is_empty())
    }
}

/// Input to a single source client call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    pub keywords: Vec<String>,
    /// Result cap. Zero or values above the source page cap fall back to the
    /// source default.
    pub limit: usize,
    pub detail: FetchConfigDetail,
}

impl FetchConfig {
    pub fn new(detail: FetchConfigDetail) -> Self {
        Self {
            keywords: Vec::new(),
            limit: 0,
            detail,
        }
    }

    /// Shorthand for a Reddit config targeting one subreddit.
    pub fn reddit(subreddit: Option<&str>) -> Self {
        Self::new(FetchConfigDetail::Reddit(RedditOptions {
            subreddit: subreddit.map(str::to_string),
            ..Default::default()
        }))
    }

    /// Sets keywords, dropping blank entries.
    pub fn with_keywords<I, T>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn source_kind(&self) -> SourceKind {
        self.detail.source_kind()
    }

    pub fn has_query_criteria(&self) -> bool {
        self.keywords.iter().any(|k| !k.trim().is_empty()) || self.detail.channel().is_some()
    }

    /// Rejects configs with neither keywords nor a channel.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.has_query_criteria() {
            Ok(())
        } else {
            Err(AppError::NoQueryCriteria)
        }
    }
}

/// Stored-data statistics for one fetch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStats {
    pub total_count: i64,
    pub last_fetched_at: Option<DateTime<Utc>>,
}
