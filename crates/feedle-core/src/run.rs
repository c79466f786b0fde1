//! Run orchestration across sources.
//!
//! [`RunService`] resolves which sources take part in a run, calls each
//! source client for its fetch jobs, and routes the results through the
//! [`DataService`]. Every job is isolated: a failure is recorded in its
//! [`JobResult`] and the run moves on.
//!
//! Per job the flow is `fetch → (preview | filter → write) → done`, with a
//! failed fetch ending the job. Nothing is retried within a run.
//!
//! # Concurrency
//!
//! Jobs run sequentially by default. With [`RunConfig::concurrency`] above 1
//! up to that many jobs are in flight at once; results are still reported in
//! plan order.
//!
//! # Cancellation
//!
//! The `*_cancellable` methods accept a `CancellationToken`. Jobs that have
//! not started when it fires are skipped. A job whose fetch is interrupted
//! ends as a failure; the records it had already fetched are not persisted.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{RunConfig, SourceKind};
use crate::data::DataService;
use crate::error::AppError;
use crate::models::{FetchConfig, NormalizedRecord};
use crate::progress::{ProgressReporter, RunEvent, SilentReporter};
use crate::registry::SourceRegistry;
use crate::summary::{JobResult, RunSummary, SaveResult};
use crate::traits::{RecordStore, SourceClient};

/// One fetch configuration to execute within a run.
#[derive(Debug, Clone)]
pub struct FetchJob {
    /// Label used in progress output and results.
    pub name: String,
    /// Owning configuration id stamped on every fetched record.
    pub config_id: Option<Uuid>,
    pub config: FetchConfig,
}

impl FetchJob {
    pub fn new(name: impl Into<String>, config: FetchConfig) -> Self {
        Self {
            name: name.into(),
            config_id: None,
            config,
        }
    }

    pub fn with_config_id(mut self, config_id: Option<Uuid>) -> Self {
        self.config_id = config_id;
        self
    }

    pub fn source(&self) -> SourceKind {
        self.config.source_kind()
    }
}

/// What a run should do.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    /// Source names to run. Empty means every registered source.
    pub sources: Vec<String>,
    pub jobs: Vec<FetchJob>,
}

impl RunPlan {
    pub fn new(sources: Vec<String>, jobs: Vec<FetchJob>) -> Self {
        Self { sources, jobs }
    }
}

/// A unit of work after source resolution.
enum WorkItem<'a> {
    Job(&'a FetchJob),
    /// A selected source with no job configured.
    Unconfigured(SourceKind),
}

/// Service orchestrating fetch runs.
///
/// # Type Parameters
///
/// * `S` - Record store implementation
/// * `C` - Source client implementation (usually an enum over concrete clients)
///
/// # Example
///
/// ```ignore
/// use feedle_core::{RunPlan, RunService, FetchJob, FetchConfig};
///
/// let service = RunService::new(repo, registry);
/// let plan = RunPlan::new(vec![], vec![FetchJob::new("rust", FetchConfig::reddit(Some("rust")))]);
/// let summary = service.run(&plan).await?;
/// println!("saved {}", summary.total_saved());
/// ```
pub struct RunService<S, C>
where
    S: RecordStore,
    C: SourceClient,
{
    data: DataService<S>,
    registry: SourceRegistry<C>,
    config: RunConfig,
}

impl<S, C> Clone for RunService<S, C>
where
    S: RecordStore,
    C: SourceClient,
{
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            registry: self.registry.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, C> RunService<S, C>
where
    S: RecordStore,
    C: SourceClient,
{
    /// Creates a run service with default configuration.
    pub fn new(store: S, registry: SourceRegistry<C>) -> Self {
        Self::with_config(store, registry, RunConfig::default())
    }

    /// Creates a run service with custom configuration.
    pub fn with_config(store: S, registry: SourceRegistry<C>, config: RunConfig) -> Self {
        Self {
            data: DataService::new(store),
            registry,
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Executes a run to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedSource`] if the plan selects a name
    /// that is not a source at all. No job runs in that case. Sources without
    /// a registered client and job failures never surface here; they are
    /// recorded in the summary.
    pub async fn run(&self, plan: &RunPlan) -> Result<RunSummary, AppError> {
        self.run_with_progress(plan, &SilentReporter).await
    }

    /// Same as [`run`](Self::run), emitting progress events.
    pub async fn run_with_progress<R: ProgressReporter>(
        &self,
        plan: &RunPlan,
        reporter: &R,
    ) -> Result<RunSummary, AppError> {
        self.run_with_progress_cancellable(plan, reporter, CancellationToken::new())
            .await
    }

    /// Same as [`run`](Self::run), stopping early when `cancel_token` fires.
    pub async fn run_cancellable(
        &self,
        plan: &RunPlan,
        cancel_token: CancellationToken,
    ) -> Result<RunSummary, AppError> {
        self.run_with_progress_cancellable(plan, &SilentReporter, cancel_token)
            .await
    }

    /// Runs a plan with progress reporting and cancellation support.
    pub async fn run_with_progress_cancellable<R: ProgressReporter>(
        &self,
        plan: &RunPlan,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> Result<RunSummary, AppError> {
        let kinds = self.run_kinds(plan)?;
        let items = Self::work_items(&kinds, plan);
        let total = items.len();

        reporter.report(RunEvent::RunStarted {
            total_jobs: total,
            dry_run: self.config.dry_run,
        });

        let cancel = &cancel_token;
        let futures: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.run_item(i, total, item, reporter, cancel))
            .collect();
        let results: Vec<Option<JobResult>> = stream::iter(futures)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut summary = RunSummary::new();
        for result in results.into_iter().flatten() {
            summary.add(result);
        }

        if cancel_token.is_cancelled() {
            summary.cancelled = true;
            reporter.report(RunEvent::RunCancelled {
                completed_jobs: summary.total_jobs(),
                total_jobs: total,
            });
        } else {
            reporter.report(RunEvent::RunCompleted { summary: &summary });
        }

        Ok(summary)
    }

    /// Sources taking part in a run. Without an explicit selection, kinds
    /// that only appear in plan jobs follow the registered ones so their
    /// jobs fail as unsupported instead of being left out.
    fn run_kinds(&self, plan: &RunPlan) -> Result<Vec<SourceKind>, AppError> {
        let mut kinds = self.registry.resolve(&plan.sources)?;
        if plan.sources.is_empty() {
            for job in &plan.jobs {
                let kind = job.source();
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        Ok(kinds)
    }

    /// Orders work by resolved source, then by job order within the plan.
    fn work_items<'a>(kinds: &[SourceKind], plan: &'a RunPlan) -> Vec<WorkItem<'a>> {
        let mut items = Vec::new();
        for &kind in kinds {
            let before = items.len();
            items.extend(
                plan.jobs
                    .iter()
                    .filter(|job| job.source() == kind)
                    .map(WorkItem::Job),
            );
            if items.len() == before {
                items.push(WorkItem::Unconfigured(kind));
            }
        }
        items
    }

    async fn run_item<R: ProgressReporter>(
        &self,
        index: usize,
        total: usize,
        item: &WorkItem<'_>,
        reporter: &R,
        cancel_token: &CancellationToken,
    ) -> Option<JobResult> {
        if cancel_token.is_cancelled() {
            return None;
        }

        match item {
            WorkItem::Job(job) => {
                Some(
                    self.run_job(index, total, job, reporter, cancel_token.clone())
                        .await,
                )
            }
            WorkItem::Unconfigured(kind) => {
                let name = kind.to_string();
                let error = if self.registry.get(*kind).is_none() {
                    AppError::UnsupportedSource(name.clone()).to_string()
                } else {
                    format!("no fetch configuration for source '{}'", kind)
                };
                reporter.report(RunEvent::JobFailed {
                    job_index: index,
                    total_jobs: total,
                    name: &name,
                    error: &error,
                });
                Some(JobResult::failure(*kind, name, None, error))
            }
        }
    }

    async fn run_job<R: ProgressReporter>(
        &self,
        index: usize,
        total: usize,
        job: &FetchJob,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> JobResult {
        let source = job.source();
        let config_id = job.config_id.or(self.config.save.config_id);

        reporter.report(RunEvent::JobStarted {
            job_index: index,
            total_jobs: total,
            source,
            name: &job.name,
        });

        let fail = |error: String| {
            reporter.report(RunEvent::JobFailed {
                job_index: index,
                total_jobs: total,
                name: &job.name,
                error: &error,
            });
            JobResult::failure(source, job.name.clone(), config_id, error)
        };

        let Some(client) = self.registry.get(source) else {
            return fail(AppError::UnsupportedSource(source.to_string()).to_string());
        };

        let mut records = match client.fetch(&job.config, cancel_token).await {
            Ok(records) => records,
            Err(e) => {
                if !e.partial.is_empty() {
                    tracing::warn!(
                        job = %job.name,
                        discarded = e.partial.len(),
                        "Fetch interrupted; partial results are not persisted"
                    );
                }
                return fail(format!("failed to fetch: {}", e.error));
            }
        };

        for record in &mut records {
            record.config_id = config_id;
        }

        reporter.report(RunEvent::JobFetched {
            name: &job.name,
            count: records.len(),
        });

        let fetched = records.len();
        let result = if self.config.dry_run {
            self.preview(&job.name, &records, reporter);
            SaveResult::dry_run(fetched)
        } else {
            let opts = self.config.save.clone().with_config_id(config_id);
            self.data.save(records, &opts).await
        };

        reporter.report(RunEvent::JobCompleted {
            job_index: index,
            total_jobs: total,
            name: &job.name,
            config_id,
            result: &result,
        });

        JobResult::success(source, job.name.clone(), config_id, fetched, result)
    }

    fn preview<R: ProgressReporter>(&self, name: &str, records: &[NormalizedRecord], reporter: &R) {
        for (i, record) in records.iter().take(self.config.preview_count).enumerate() {
            reporter.report(RunEvent::RecordPreview {
                name,
                position: i + 1,
                record,
            });
        }
    }
}
