//! Progress reporting for fetch runs.
//!
//! Services emit [`RunEvent`]s through a [`ProgressReporter`] instead of
//! printing directly, so the CLI can log them and tests can stay silent.

use uuid::Uuid;

use crate::config::SourceKind;
use crate::models::NormalizedRecord;
use crate::summary::{RunSummary, SaveResult};

/// Events emitted during a run.
#[derive(Debug)]
pub enum RunEvent<'a> {
    RunStarted {
        total_jobs: usize,
        dry_run: bool,
    },
    JobStarted {
        job_index: usize,
        total_jobs: usize,
        source: SourceKind,
        name: &'a str,
    },
    JobFetched {
        name: &'a str,
        count: usize,
    },
    /// A record shown instead of persisted in dry-run mode.
    RecordPreview {
        name: &'a str,
        position: usize,
        record: &'a NormalizedRecord,
    },
    JobCompleted {
        job_index: usize,
        total_jobs: usize,
        name: &'a str,
        config_id: Option<Uuid>,
        result: &'a SaveResult,
    },
    JobFailed {
        job_index: usize,
        total_jobs: usize,
        name: &'a str,
        error: &'a str,
    },
    RunCancelled {
        completed_jobs: usize,
        total_jobs: usize,
    },
    RunCompleted {
        summary: &'a RunSummary,
    },
}

/// Receives run events. Must be shareable across concurrently running jobs.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: RunEvent<'_>) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::RunStarted {
                total_jobs,
                dry_run,
            } => {
                if dry_run {
                    tracing::info!("Starting dry run of {} fetch job(s)", total_jobs);
                } else {
                    tracing::info!("Starting run of {} fetch job(s)", total_jobs);
                }
            }
            RunEvent::JobStarted {
                job_index,
                total_jobs,
                source,
                name,
            } => {
                tracing::info!(
                    "[{}/{}] Fetching from {} ({})...",
                    job_index + 1,
                    total_jobs,
                    source,
                    name
                );
            }
            RunEvent::JobFetched { name, count } => {
                tracing::info!(job = name, "Found {} records", count);
            }
            RunEvent::RecordPreview {
                position, record, ..
            } => {
                let score = record
                    .score()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "n/a".to_string());
                tracing::info!("  [{}] {} (score: {})", position, record.title, score);
            }
            RunEvent::JobCompleted {
                job_index,
                total_jobs,
                name,
                result,
                ..
            } => {
                tracing::info!(
                    "[{}/{}] {}: {}",
                    job_index + 1,
                    total_jobs,
                    name,
                    result.summary()
                );
            }
            RunEvent::JobFailed {
                job_index,
                total_jobs,
                name,
                error,
            } => {
                tracing::warn!(
                    "[{}/{}] {} failed: {}",
                    job_index + 1,
                    total_jobs,
                    name,
                    error
                );
            }
            RunEvent::RunCancelled {
                completed_jobs,
                total_jobs,
            } => {
                tracing::warn!(
                    "Run cancelled after {}/{} job(s)",
                    completed_jobs,
                    total_jobs
                );
            }
            RunEvent::RunCompleted { summary } => {
                tracing::info!(
                    "Run complete: {} saved, {} job(s) failed",
                    summary.total_saved(),
                    summary.failed_count()
                );
            }
        }
    }
}
