//! Configuration types for the fetch pipeline.
//!
//! Runtime knobs (HTTP timeouts, batch sizes, concurrency) have sensible
//! defaults here; the CLI layers environment variables and flags on top.
//! [`FetchProfilesConfig`] is the shape of the fetch profile file read by
//! the CLI:
//!
//! ```toml
//! [[profiles]]
//! name = "rust-news"
//! type = "reddit"
//! subreddit = "rust"
//! keywords = ["tokio", "async"]
//! sort = "top"
//! time_filter = "week"
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FetchConfig, FetchConfigDetail, RedditOptions, YouTubeOptions};

/// Database connection pool configuration.
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for source clients.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout applied to every listing/search request.
    pub timeout: Duration,
    /// Timeout applied to the credential exchange.
    pub token_timeout: Duration,
    /// Fixed delay inserted before each outbound request.
    pub request_delay: Duration,
    pub user_agent: String,
}

impl HttpConfig {
    /// Builds the user agent string, naming the account owner when known.
    pub fn user_agent_for(username: Option<&str>) -> String {
        let version = env!("CARGO_PKG_VERSION");
        match username {
            Some(name) if !name.is_empty() => format!("feedle-batch/{version} (by /u/{name})"),
            _ => format!("feedle-batch/{version}"),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            token_timeout: Duration::from_secs(10),
            request_delay: Duration::from_secs(1),
            user_agent: Self::user_agent_for(None),
        }
    }
}

/// Options controlling how fetched records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Assigned to records that do not carry a configuration id yet.
    pub config_id: Option<Uuid>,
    /// Check the store for an existing record with the same URL.
    pub skip_duplicates_by_url: bool,
    /// Records per store write. Zero means [`SaveOptions::DEFAULT_BATCH_SIZE`].
    pub batch_size: usize,
}

impl SaveOptions {
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    /// Batch size with the zero fallback applied.
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 {
            Self::DEFAULT_BATCH_SIZE
        } else {
            self.batch_size
        }
    }

    pub fn with_config_id(mut self, config_id: Option<Uuid>) -> Self {
        self.config_id = config_id;
        self
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            config_id: None,
            skip_duplicates_by_url: false,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Run orchestration configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of fetch jobs processed at the same time. 1 keeps the run
    /// strictly sequential.
    pub concurrency: usize,
    /// When set, records are previewed instead of persisted.
    pub dry_run: bool,
    /// Number of records shown per job in dry-run mode.
    pub preview_count: usize,
    /// Persistence options; the job's config id overrides `save.config_id`.
    pub save: SaveOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            dry_run: false,
            preview_count: 3,
            save: SaveOptions {
                config_id: None,
                skip_duplicates_by_url: true,
                batch_size: 50,
            },
        }
    }
}

impl RunConfig {
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_save_options(mut self, save: SaveOptions) -> Self {
        self.save = save;
        self
    }
}

/// Content source type.
///
/// Determines which client implementation handles a fetch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Reddit,
    YouTube,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Reddit, SourceKind::YouTube];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Reddit => "reddit",
            SourceKind::YouTube => "youtube",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(SourceKind::Reddit),
            "youtube" => Ok(SourceKind::YouTube),
            _ => Err(AppError::UnsupportedSource(s.to_string())),
        }
    }
}

/// A named fetch profile declared in the profiles file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchProfile {
    pub name: String,

    #[serde(rename = "type", default)]
    pub source: SourceKind,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Owning configuration id stamped on every record of this profile.
    pub config_id: Option<Uuid>,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Result cap. Defaults to 25 for Reddit and 50 for YouTube.
    pub limit: Option<usize>,

    // Reddit
    pub subreddit: Option<String>,
    pub sort: Option<String>,
    pub time_filter: Option<String>,

    // YouTube
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
    pub order: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl FetchProfile {
    /// Builds the fetch configuration this profile describes.
    pub fn to_fetch_config(&self) -> FetchConfig {
        match self.source {
            SourceKind::Reddit => {
                let options = RedditOptions {
                    subreddit: self.subreddit.clone(),
                    sort: Some(self.sort.clone().unwrap_or_else(|| "hot".to_string())),
                    time_filter: Some(
                        self.time_filter
                            .clone()
                            .unwrap_or_else(|| "day".to_string()),
                    ),
                };
                FetchConfig::new(FetchConfigDetail::Reddit(options))
                    .with_keywords(self.keywords.clone())
                    .with_limit(self.limit.unwrap_or(25))
            }
            SourceKind::YouTube => {
                let options = YouTubeOptions {
                    channel_id: self.channel_id.clone(),
                    playlist_id: self.playlist_id.clone(),
                    order: self
                        .order
                        .clone()
                        .unwrap_or_else(|| YouTubeOptions::DEFAULT_ORDER.to_string()),
                };
                FetchConfig::new(FetchConfigDetail::YouTube(options))
                    .with_keywords(self.keywords.clone())
                    .with_limit(self.limit.unwrap_or(YouTubeOptions::DEFAULT_MAX_RESULTS))
            }
        }
    }
}

/// Root structure of the profiles file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FetchProfilesConfig {
    #[serde(default)]
    pub profiles: Vec<FetchProfile>,
}

impl FetchProfilesConfig {
    pub fn enabled_profiles(&self) -> Vec<&FetchProfile> {
        self.profiles.iter().filter(|p| p.enabled).collect()
    }

    /// Case-insensitive lookup by profile name.
    pub fn find_by_name(&self, name: &str) -> Option<&FetchProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
