//! Ingestion command handlers.
//!
//! Called from `main` once the pool and config exist. A single-influencer
//! ingestion fails the process on any terminal error; a batch only fails when
//! every attempted influencer failed.

use influ_core::{AppConfig, Influencer};
use influ_db::{PgInsightStore, RunCounts};
use influ_engagement::{BatchReport, IngestContext, IngestOutcome, Stage};

use crate::fail_run_best_effort;

async fn load_influencer(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<Influencer> {
    influ_db::get_influencer(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("influencer {id} not found"))
}

/// Ingests one influencer.
///
/// # Errors
///
/// Returns an error if the influencer does not exist or ingestion fails at
/// any stage.
pub(crate) async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    id: i64,
) -> anyhow::Result<()> {
    let influencer = load_influencer(pool, id).await?;
    let ctx = IngestContext::from_app_config(config)?;
    let store = PgInsightStore::new(pool.clone());

    match influ_engagement::ingest(&ctx, &store, &influencer).await {
        Ok(IngestOutcome::Skipped) => {
            println!("influencer {id} skipped: missing account id or access token");
            Ok(())
        }
        Ok(IngestOutcome::Ingested(report)) => {
            println!(
                "influencer {id} ingested: {} posts over {} pages, engagement rate {:.4}%",
                report.posts_considered, report.pages_fetched, report.engagement_rate
            );
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("ingestion failed for influencer {id}"))),
    }
}

/// Ingests every influencer with credentials and records the batch as an
/// ingestion run.
///
/// When `dry_run` is `true` prints the influencers that would be ingested and
/// returns without fetching or recording anything.
///
/// # Errors
///
/// Returns an error if the run cannot be created or completed, or if every
/// attempted influencer failed.
pub(crate) async fn run_ingest_all(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    let influencers = influ_db::list_influencers_with_credentials(pool).await?;

    if dry_run {
        let ids: Vec<String> = influencers.iter().map(|i| i.id.to_string()).collect();
        println!(
            "dry-run: would ingest {} influencers: [{}]",
            influencers.len(),
            ids.join(", ")
        );
        return Ok(());
    }

    let ctx = IngestContext::from_app_config(config)?;
    let store = PgInsightStore::new(pool.clone());

    let run = influ_db::create_ingestion_run(pool, "cli").await?;
    if let Err(e) = influ_db::start_ingestion_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, RunCounts::default(), format!("{e:#}")).await;
        return Err(e.into());
    }

    let report =
        influ_engagement::run_batch(&ctx, &store, &influencers, config.ingest_max_concurrent)
            .await;
    record_outcomes(pool, run.id, &report).await;
    let counts = run_counts(&report);

    if report.all_failed() {
        let message = format!("all {} attempted influencers failed", report.failures.len());
        fail_run_best_effort(pool, run.id, counts, message.clone()).await;
        anyhow::bail!("{message}");
    }

    if let Err(err) = influ_db::complete_ingestion_run(pool, run.id, counts).await {
        fail_run_best_effort(pool, run.id, counts, format!("{err:#}")).await;
        return Err(err.into());
    }

    println!(
        "ingestion run {}: {} succeeded, {} skipped, {} failed",
        run.id, counts.succeeded, counts.skipped, counts.failed
    );
    for failure in &report.failures {
        println!(
            "  influencer {} failed at {}: {}",
            failure.influencer_id,
            failure.stage.map_or("deadline", Stage::as_str),
            failure.message
        );
    }
    Ok(())
}

/// Writes one `ingestion_run_influencers` row per outcome. Failures to record
/// are logged and do not fail the run.
async fn record_outcomes(pool: &sqlx::PgPool, run_id: i64, report: &BatchReport) {
    let rows = report
        .succeeded
        .iter()
        .map(|r| (r.influencer_id, "succeeded", None, None))
        .chain(report.skipped.iter().map(|id| (*id, "skipped", None, None)))
        .chain(report.failures.iter().map(|f| {
            (
                f.influencer_id,
                "failed",
                f.stage.map(Stage::as_str),
                Some(f.message.as_str()),
            )
        }));

    for (influencer_id, status, stage, message) in rows {
        if let Err(e) =
            influ_db::record_run_influencer(pool, run_id, influencer_id, status, stage, message)
                .await
        {
            tracing::warn!(run_id, influencer_id, error = %e, "failed to record influencer outcome");
        }
    }
}

fn run_counts(report: &BatchReport) -> RunCounts {
    let count = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
    RunCounts {
        succeeded: count(report.succeeded.len()),
        skipped: count(report.skipped.len()),
        failed: count(report.failures.len()),
    }
}

/// Prints the uncapped engagement rate of one influencer as JSON.
///
/// # Errors
///
/// Returns an error if the influencer does not exist, has no Instagram
/// channel, no credentials are available, or the discovery crawl fails.
pub(crate) async fn run_rate(pool: &sqlx::PgPool, config: &AppConfig, id: i64) -> anyhow::Result<()> {
    let influencer = load_influencer(pool, id).await?;
    let ctx = IngestContext::from_app_config(config)?;

    let payload = influ_engagement::simple_engagement_rate(&ctx, &influencer)
        .await
        .map_err(|e| anyhow::Error::new(e).context(format!("rate failed for influencer {id}")))?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "influencer {id} has no credentials and INFLU_DISCOVERY_ACCOUNT_ID is not set"
            )
        })?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
