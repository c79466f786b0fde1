//! Outcome accounting for save operations and whole runs.
//!
//! These are plain data types with no I/O, shared by the persistence
//! service, the orchestrator and the CLI.

use serde::Serialize;
use uuid::Uuid;

use crate::config::SourceKind;

/// Outcome of persisting one batch of fetched records.
///
/// `total == saved + duplicates + skipped` holds once [`finalize`](Self::finalize)
/// has run. Errors are non-fatal: one string per failed duplicate check or
/// failed batch write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveResult {
    pub total: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl SaveResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Result for a dry run: everything counted, nothing written.
    pub fn dry_run(total: usize) -> Self {
        Self {
            total,
            skipped: total,
            ..Default::default()
        }
    }

    /// Computes `skipped` from the other counters.
    pub fn finalize(&mut self) {
        self.skipped = self
            .total
            .saturating_sub(self.saved)
            .saturating_sub(self.duplicates);
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// One-line summary, e.g. `Total: 10, Saved: 8, Duplicates: 2, Skipped: 0`.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Total: {}, Saved: {}, Duplicates: {}, Skipped: {}",
            self.total, self.saved, self.duplicates, self.skipped
        );
        if !self.errors.is_empty() {
            line.push_str(&format!(", Errors: {}", self.errors.len()));
        }
        line
    }
}

/// Result of one fetch job within a run.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub source: SourceKind,
    /// Job label (profile name or subreddit).
    pub name: String,
    pub config_id: Option<Uuid>,
    /// Records returned by the source client.
    pub fetched: usize,
    pub success: bool,
    pub result: Option<SaveResult>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(
        source: SourceKind,
        name: String,
        config_id: Option<Uuid>,
        fetched: usize,
        result: SaveResult,
    ) -> Self {
        Self {
            source,
            name,
            config_id,
            fetched,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(
        source: SourceKind,
        name: String,
        config_id: Option<Uuid>,
        error: String,
    ) -> Self {
        Self {
            source,
            name,
            config_id,
            fetched: 0,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    pub fn saved(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.saved)
    }
}

/// Aggregated results of a run across sources and jobs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<JobResult>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: JobResult) {
        self.results.push(result);
    }

    pub fn total_jobs(&self) -> usize {
        self.results.len()
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// Distinct sources with at least one failed job, in first-seen order.
    pub fn failed_sources(&self) -> Vec<SourceKind> {
        let mut sources = Vec::new();
        for r in self.results.iter().filter(|r| !r.success) {
            if !sources.contains(&r.source) {
                sources.push(r.source);
            }
        }
        sources
    }

    pub fn total_fetched(&self) -> usize {
        self.results.iter().map(|r| r.fetched).sum()
    }

    pub fn total_saved(&self) -> usize {
        self.results.iter().map(JobResult::saved).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref())
            .map(|r| r.duplicates)
            .sum()
    }
}
