//! Database-only commands: seeding identities and listing runs.

use std::path::Path;

use anyhow::Context;

/// Loads `path` and upserts every influencer it lists.
///
/// # Errors
///
/// Returns an error if the file fails to load or validate, or if the seed
/// transaction fails.
pub(crate) async fn run_seed(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let file = influ_core::load_influencers(path)?;
    let count = influ_db::seed_influencers(pool, &file.influencers).await?;
    tracing::info!(count, path = %path.display(), "seeded influencers");
    println!("seeded {count} influencers from {}", path.display());
    Ok(())
}

pub(crate) async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = influ_db::list_ingestion_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no ingestion runs recorded");
        return Ok(());
    }

    for run in runs {
        println!(
            "{:>6}  {:<9}  {:<4}  ok={} skipped={} failed={}  {}{}",
            run.id,
            run.status,
            run.trigger_source,
            run.influencers_succeeded,
            run.influencers_skipped,
            run.influencers_failed,
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.error_message
                .map(|m| format!("  error: {m}"))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

/// Prints one run and the per-influencer outcomes recorded for it.
///
/// # Errors
///
/// Returns an error if the run does not exist or a query fails.
pub(crate) async fn run_show_run(pool: &sqlx::PgPool, run_id: i64) -> anyhow::Result<()> {
    let run = influ_db::get_ingestion_run(pool, run_id)
        .await
        .with_context(|| format!("loading ingestion run {run_id}"))?;
    println!(
        "run {} ({})  {}  ok={} skipped={} failed={}",
        run.id,
        run.public_id,
        run.status,
        run.influencers_succeeded,
        run.influencers_skipped,
        run.influencers_failed,
    );

    let rows = influ_db::list_ingestion_run_influencers(pool, run_id).await?;
    if rows.is_empty() {
        println!("no influencer outcomes recorded for run {run_id}");
        return Ok(());
    }

    for row in rows {
        println!("{}", format_run_influencer(&row));
    }
    Ok(())
}

fn format_run_influencer(row: &influ_db::IngestionRunInfluencerRow) -> String {
    format!(
        "{:>6}  {:<9}{}{}",
        row.influencer_id,
        row.status,
        row.stage
            .as_ref()
            .map(|s| format!("  stage={s}"))
            .unwrap_or_default(),
        row.error_message
            .as_ref()
            .map(|m| format!("  error: {m}"))
            .unwrap_or_default(),
    )
}
