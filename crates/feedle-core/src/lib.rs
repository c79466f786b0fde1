//! Feedle Core - Domain types, pipeline services and traits.
//!
//! This crate provides the fetch → normalize → dedup → persist pipeline:
//!
//! - **Domain models**: [`NormalizedRecord`], [`FetchConfig`], [`FetchConfigDetail`]
//! - **Persistence**: [`DataService`] combining the [`DuplicateFilter`] and the [`BatchWriter`]
//! - **Orchestration**: [`RunService`] running [`FetchJob`]s against a [`SourceRegistry`]
//! - **Traits**: [`SourceClient`] and [`RecordStore`] for dependency injection
//! - **Progress reporting**: [`ProgressReporter`] trait for decoupled logging/UI
//!
//! # Architecture
//!
//! Business logic is decoupled from I/O through traits. `feedle-client`
//! implements [`SourceClient`] over HTTP and `feedle-db` implements
//! [`RecordStore`] over PostgreSQL; the CLI wires them together.
//!
//! # Example
//!
//! ```ignore
//! use feedle_core::{FetchConfig, FetchJob, RunPlan, RunService, TracingReporter};
//!
//! let service = RunService::new(repo, registry);
//! let plan = RunPlan::new(
//!     vec!["reddit".to_string()],
//!     vec![FetchJob::new("rust", FetchConfig::reddit(Some("rust")).with_keywords(["tokio"]))],
//! );
//! let summary = service.run_with_progress(&plan, &TracingReporter).await?;
//! ```

pub mod batch;
pub mod config;
pub mod data;
pub mod dedup;
pub mod error;
pub mod models;
pub mod progress;
pub mod registry;
pub mod run;
pub mod summary;
pub mod traits;

// Configuration
pub use config::{
    DbConfig, FetchProfile, FetchProfilesConfig, HttpConfig, RunConfig, SaveOptions, SourceKind,
};

// Error handling
pub use error::{AppError, FetchError};

// Domain models
pub use models::{
    DataStats, FetchConfig, FetchConfigDetail, NormalizedRecord, RedditOptions, YouTubeOptions,
};

// Outcome accounting
pub use summary::{JobResult, RunSummary, SaveResult};

// Progress reporting
pub use progress::{ProgressReporter, RunEvent, SilentReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{RecordStore, SourceClient};

// Pipeline stages and services
pub use batch::{BatchOutcome, BatchWriter};
pub use data::DataService;
pub use dedup::{DuplicateFilter, FilterOutcome};
pub use registry::SourceRegistry;
pub use run::{FetchJob, RunPlan, RunService};
