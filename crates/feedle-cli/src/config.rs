use clap::{Args, Parser, Subcommand};
use feedle_core::{AppError, FetchConfig, FetchJob, FetchProfilesConfig};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use uuid::Uuid;

static VERSION_INFO: LazyLock<String> = LazyLock::new(|| {
    let version = env!("CARGO_PKG_VERSION");

    let commit = option_env!("VERGEN_GIT_SHA")
        .map(|s| s.chars().take(7).collect::<String>())
        .unwrap_or_else(|| "unknown".to_string());

    let built = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown");
    let target = option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown");
    let rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown");

    format!("{version}\ncommit: {commit}\nbuilt: {built}\ntarget: {target}\nrustc: {rustc}")
});

pub fn version_info() -> &'static str {
    &VERSION_INFO
}

/// Subreddits fetched when none are given on the command line.
pub const DEFAULT_SUBREDDITS: [&str; 2] = ["golang", "programming"];

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "feedle")]
#[command(
    author,
    version = version_info(),
    about = "Batch fetcher for Reddit content"
)]
#[command(after_help = "Examples:
  feedle fetch --subreddits rust,golang --limit 50
  feedle fetch --keywords tokio,axum --dry-run
  feedle stats --config-id 7f0c...
  feedle recent --config-id 7f0c... --limit 20

Credentials:
  REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET enable authenticated access.
  Without them the public endpoints are used.")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Reddit application client id
    #[arg(long, env = "REDDIT_CLIENT_ID")]
    pub reddit_client_id: Option<String>,

    /// Reddit application client secret
    #[arg(long, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    pub reddit_client_secret: Option<String>,

    /// Reddit account name, shown in the user agent
    #[arg(long, env = "REDDIT_USERNAME")]
    pub reddit_username: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Client credentials, when both id and secret are set.
    pub fn reddit_credentials(&self) -> Option<(&str, &str)> {
        match (&self.reddit_client_id, &self.reddit_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch content and store new records
    #[command(after_help = "Examples:
  feedle fetch                                # Enabled profiles from config, or defaults
  feedle fetch --subreddits rust --limit 100  # One subreddit
  feedle fetch --keywords \"async rust\"        # Search all of Reddit
  feedle fetch --config ~/custom.toml         # Use custom profile file
  feedle fetch --dry-run                      # Preview without writing")]
    Fetch(FetchArgs),
    /// Show stored-record statistics for a configuration
    Stats {
        /// Configuration id
        #[arg(long, value_name = "UUID")]
        config_id: Uuid,
    },
    /// List the most recently fetched records of a configuration
    Recent {
        /// Configuration id
        #[arg(long, value_name = "UUID")]
        config_id: Uuid,
        /// Maximum number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Sources to run (default: all registered)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub sources: Vec<String>,

    /// Subreddits to fetch, one job each
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub subreddits: Vec<String>,

    /// Search keywords applied to every job
    #[arg(long, value_delimiter = ',', value_name = "WORDS")]
    pub keywords: Vec<String>,

    /// Maximum records per job
    #[arg(short, long, default_value = "25")]
    pub limit: usize,

    /// Preview records instead of storing them
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration id stamped on stored records
    #[arg(long, value_name = "UUID")]
    pub config_id: Option<Uuid>,

    /// Custom path to the fetch profile file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Jobs processed at the same time
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Abort the run after this many seconds
    #[arg(long, default_value = "600")]
    pub timeout_secs: u64,
}

impl FetchArgs {
    /// Whether jobs should come from the profile file instead of flags.
    pub fn wants_profiles(&self) -> bool {
        self.subreddits.is_empty() && self.keywords.is_empty()
    }

    /// One Reddit job per subreddit, falling back to [`DEFAULT_SUBREDDITS`].
    pub fn flag_jobs(&self) -> Vec<FetchJob> {
        let subreddits: Vec<String> = if self.subreddits.is_empty() {
            DEFAULT_SUBREDDITS.iter().map(|s| s.to_string()).collect()
        } else {
            self.subreddits.clone()
        };

        subreddits
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|subreddit| {
                let config = FetchConfig::reddit(Some(subreddit))
                    .with_keywords(self.keywords.clone())
                    .with_limit(self.limit);
                FetchJob::new(format!("r/{}", subreddit), config).with_config_id(self.config_id)
            })
            .collect()
    }
}

/// Default location of the profile file (`~/.config/feedle/fetch.toml` on Linux).
pub fn default_profiles_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("feedle").join("fetch.toml"))
}

/// Load fetch profiles from a TOML file.
///
/// * `Ok(Some(config))` - file loaded
/// * `Ok(None)` - no path given and no file at the default location
/// * `Err(e)` - an explicit path is missing, or the file is invalid
pub fn load_fetch_profiles(path: Option<PathBuf>) -> Result<Option<FetchProfilesConfig>, AppError> {
    let explicit = path.is_some();
    let config_path = match path.or_else(default_profiles_path) {
        Some(p) => p,
        None => return Ok(None),
    };

    if !config_path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }
        tracing::debug!(path = %config_path.display(), "No fetch profile file found");
        return Ok(None);
    }

    read_profiles(&config_path).map(Some)
}

fn read_profiles(path: &Path) -> Result<FetchProfilesConfig, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        AppError::ConfigError(format!("Invalid TOML in '{}': {}", path.display(), e))
    })
}
