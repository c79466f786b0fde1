use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use feedle_client::{RedditCredentials, SourceClientEnum, build_registry};
use feedle_core::{
    AppError, DataService, DbConfig, FetchJob, HttpConfig, JobResult, RunConfig, RunPlan,
    RunService, RunSummary, TracingReporter,
};
use feedle_cli::{Command, Config, FetchArgs, load_fetch_profiles};
use feedle_db::RecordRepository;

/// Errors listed per job before the rest are collapsed.
const MAX_DISPLAYED_ERRORS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = Config::parse();

    info!("Connecting to database...");
    let db_config = DbConfig::default();
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!(AppError::DatabaseError(e).user_message()))?;

    let repo = RecordRepository::new(pool);

    match &config.command {
        Command::Fetch(args) => {
            let summary = fetch(&config, args, repo).await?;
            print_run_summary(&summary);
        }
        Command::Stats { config_id } => {
            show_stats(&DataService::new(repo), *config_id).await?;
        }
        Command::Recent { config_id, limit } => {
            show_recent(&DataService::new(repo), *config_id, *limit).await?;
        }
    }

    Ok(())
}

async fn fetch(
    config: &Config,
    args: &FetchArgs,
    repo: RecordRepository,
) -> anyhow::Result<RunSummary> {
    let credentials = config.reddit_credentials().map(|(id, secret)| {
        RedditCredentials::new(id, secret).with_username(config.reddit_username.clone())
    });
    if credentials.is_none() {
        info!("No Reddit credentials set, using public endpoints");
    }

    let http_config = HttpConfig::default().with_user_agent(HttpConfig::user_agent_for(
        config.reddit_username.as_deref(),
    ));
    let registry = build_registry(&http_config, credentials)?;

    let jobs = resolve_jobs(args)?;
    if jobs.is_empty() {
        info!("No fetch jobs to run.");
        return Ok(RunSummary::new());
    }

    let mut run_config = RunConfig::default().with_concurrency(args.concurrency);
    if args.dry_run {
        run_config = run_config.with_dry_run();
    }
    let save = run_config.save.clone().with_config_id(args.config_id);
    run_config = run_config.with_save_options(save);

    let service: RunService<RecordRepository, SourceClientEnum> =
        RunService::with_config(repo, registry, run_config);
    let plan = RunPlan::new(args.sources.clone(), jobs);

    let cancel_token = CancellationToken::new();
    spawn_cancel_watcher(cancel_token.clone(), Duration::from_secs(args.timeout_secs));

    let summary = service
        .run_with_progress_cancellable(&plan, &TracingReporter, cancel_token.clone())
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    // Stop the watcher task.
    cancel_token.cancel();

    Ok(summary)
}

/// Jobs from the enabled profiles when no subreddit or keyword flags are
/// given and a profile file exists, else jobs built from flags.
fn resolve_jobs(args: &FetchArgs) -> anyhow::Result<Vec<FetchJob>> {
    if args.wants_profiles() {
        if let Some(profiles) = load_fetch_profiles(args.config.clone())? {
            let enabled = profiles.enabled_profiles();
            info!("Loaded {} enabled fetch profile(s)", enabled.len());
            return Ok(enabled
                .into_iter()
                .map(|profile| {
                    FetchJob::new(profile.name.clone(), profile.to_fetch_config())
                        .with_config_id(profile.config_id.or(args.config_id))
                })
                .collect());
        }
    }

    Ok(args.flag_jobs())
}

/// Cancels the run on Ctrl-C or once `timeout` has elapsed.
fn spawn_cancel_watcher(cancel_token: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("Interrupt received, cancelling run...");
                    cancel_token.cancel();
                }
            }
            _ = tokio::time::sleep(timeout) => {
                warn!("Run exceeded {}s timeout, cancelling...", timeout.as_secs());
                cancel_token.cancel();
            }
            _ = cancel_token.cancelled() => {}
        }
    });
}

fn print_run_summary(summary: &RunSummary) {
    info!("");
    info!("═══════════════════════════════════════════════════════");
    if summary.cancelled {
        info!("RUN CANCELLED");
    } else {
        info!("RUN COMPLETE");
    }
    info!("═══════════════════════════════════════════════════════");
    info!("  Jobs processed:      {}", summary.total_jobs());
    info!("  Successful:          {}", summary.successful_count());
    info!("  Failed:              {}", summary.failed_count());
    info!("  Records fetched:     {}", summary.total_fetched());
    info!("  Records saved:       {}", summary.total_saved());
    info!("  Duplicates:          {}", summary.total_duplicates());
    info!("───────────────────────────────────────────────────────");

    for result in &summary.results {
        print_job_result(result);
    }
    info!("═══════════════════════════════════════════════════════");
}

fn print_job_result(result: &JobResult) {
    match (&result.result, &result.error) {
        (Some(save), _) => {
            info!("  {} [{}]: {}", result.name, result.source, save.summary());
            for line in error_lines(&save.errors) {
                warn!("      {}", line);
            }
        }
        (None, Some(err)) => error!("  {} [{}]: {}", result.name, result.source, err),
        (None, None) => info!("  {} [{}]: no result", result.name, result.source),
    }
}

/// Up to [`MAX_DISPLAYED_ERRORS`] errors, then a count of the remainder.
fn error_lines(errors: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = errors
        .iter()
        .take(MAX_DISPLAYED_ERRORS)
        .map(|e| format!("- {}", e))
        .collect();
    if errors.len() > MAX_DISPLAYED_ERRORS {
        lines.push(format!(
            "... and {} more errors",
            errors.len() - MAX_DISPLAYED_ERRORS
        ));
    }
    lines
}

async fn show_stats(service: &DataService<RecordRepository>, config_id: Uuid) -> anyhow::Result<()> {
    let stats = service
        .stats(config_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("\nStored records for {}\n", config_id);
    println!("  Total records:         {}", stats.total_count);
    match stats.last_fetched_at {
        Some(last) => println!("  Last fetched:          {}", last),
        None => println!("  Last fetched:          never"),
    }
    println!();

    Ok(())
}

async fn show_recent(
    service: &DataService<RecordRepository>,
    config_id: Uuid,
    limit: usize,
) -> anyhow::Result<()> {
    let records = service
        .recent(config_id, limit)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if records.is_empty() {
        println!("\nNo records stored for {}\n", config_id);
        return Ok(());
    }

    println!("\nLatest {} record(s) for {}\n", records.len(), config_id);
    for (i, record) in records.iter().enumerate() {
        let score = record
            .score()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        println!("{}. {} (score: {})", i + 1, truncate_text(&record.title, 100), score);
        if let Some(url) = &record.url {
            println!("   {}", url);
        }
        if let Some(fetched_at) = record.fetched_at {
            println!("   fetched {}", fetched_at);
        }
        println!();
    }

    Ok(())
}

fn truncate_text(text: &str, max_len: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() <= max_len {
        cleaned
    } else {
        let truncated: String = cleaned.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}
