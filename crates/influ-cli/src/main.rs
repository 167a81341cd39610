use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod db;
mod ingest;

#[derive(Debug, Parser)]
#[command(name = "influ-cli")]
#[command(about = "Instagram influencer engagement ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest one influencer and persist their insights.
    Ingest {
        /// Influencer id in the `influencers` table.
        id: i64,
    },
    /// Ingest every influencer that has credentials.
    IngestAll {
        /// List the influencers that would be ingested without fetching anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the uncapped engagement rate of one influencer as JSON.
    Rate { id: i64 },
    /// Upsert influencer identities from a YAML file.
    Seed {
        /// Defaults to `INFLU_INFLUENCERS_PATH`.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List recent ingestion runs, or the per-influencer outcomes of one run.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Show the per-influencer outcomes of this run instead of the list.
        #[arg(long)]
        id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = influ_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = influ_db::PoolConfig::from_app_config(&config);
    let pool = influ_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = influ_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    match cli.command {
        Commands::Ingest { id } => ingest::run_ingest(&pool, &config, id).await,
        Commands::IngestAll { dry_run } => ingest::run_ingest_all(&pool, &config, dry_run).await,
        Commands::Rate { id } => ingest::run_rate(&pool, &config, id).await,
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.influencers_path.clone());
            db::run_seed(&pool, &path).await
        }
        Commands::Runs { id: Some(id), .. } => db::run_show_run(&pool, id).await,
        Commands::Runs { limit, id: None } => db::run_list_runs(&pool, limit).await,
    }
}

/// Marks a run as failed, logging instead of propagating if that also fails.
async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    counts: influ_db::RunCounts,
    message: String,
) {
    if let Err(mark_err) = influ_db::fail_ingestion_run(pool, run_id, counts, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark ingestion run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
