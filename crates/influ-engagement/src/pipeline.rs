//! Per-influencer ingestion: audience lookups, the capped media crawl, and a
//! single insight upsert.

use std::time::Duration;

use chrono::Utc;
use influ_core::{AppConfig, Credentials, Influencer};
use influ_db::{InfluencerInsights, InsightStore};
use influ_graph::{Crawler, DiscoverySource, GraphClient, GraphError, MediaFeedSource};
use serde::Serialize;

use crate::aggregate::{aggregate_crawl, AggregateResult};
use crate::audience::{fetch_audience, AudienceProfile};
use crate::error::{IngestError, Stage};

/// Everything ingestion needs besides the store, passed explicitly to every
/// call.
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub graph: GraphClient,
    /// Posts considered by the enrichment crawl; `None` is uncapped.
    pub post_cap: Option<usize>,
    pub max_pages: usize,
    /// Upper bound on the fetch stages of one influencer.
    pub deadline: Duration,
    /// Account used for `business_discovery` lookups, if configured.
    pub discovery_account: Option<Credentials>,
}

impl IngestContext {
    /// # Errors
    ///
    /// Returns [`GraphError`] if the HTTP client cannot be built from the
    /// configured base URL.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GraphError> {
        let graph = GraphClient::with_base_url(
            &config.graph_base_url,
            config.graph_request_timeout_secs,
            &config.graph_user_agent,
        )?;
        Ok(Self {
            graph,
            post_cap: config.post_cap(),
            max_pages: config.ingest_max_pages,
            deadline: Duration::from_secs(config.ingest_deadline_secs),
            discovery_account: config.discovery_account.as_ref().map(|a| Credentials {
                account_id: a.account_id.clone(),
                access_token: a.access_token.clone(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The influencer has no usable credentials; nothing was fetched or
    /// written.
    Skipped,
    Ingested(IngestReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub influencer_id: i64,
    pub total_followers: u64,
    pub posts_considered: usize,
    pub pages_fetched: usize,
    pub engagement_rate: f64,
}

/// Ingests one influencer and writes the result with exactly one
/// [`InsightStore::upsert_insights`] call.
///
/// The fetch stages run under `ctx.deadline`; the write is only issued once
/// every stage has succeeded.
///
/// # Errors
///
/// Returns [`IngestError`] for any terminal failure. No write has happened
/// when an error other than [`IngestError::Store`] is returned.
pub async fn ingest<S>(
    ctx: &IngestContext,
    store: &S,
    influencer: &Influencer,
) -> Result<IngestOutcome, IngestError>
where
    S: InsightStore + Sync,
{
    let influencer_id = influencer.id;
    let Some(credentials) = influencer.credentials() else {
        tracing::info!(influencer_id, "no credentials; skipping ingestion");
        return Ok(IngestOutcome::Skipped);
    };

    tracing::info!(influencer_id, "ingestion started");

    let (insights, report) =
        with_deadline(ctx, influencer_id, collect(ctx, &credentials, influencer_id))
            .await
            .inspect_err(log_failure)?;

    store
        .upsert_insights(&insights)
        .await
        .map_err(|source| IngestError::Store {
            influencer_id,
            source,
        })
        .inspect_err(log_failure)?;

    tracing::info!(
        influencer_id,
        posts_considered = report.posts_considered,
        pages = report.pages_fetched,
        engagement_rate = report.engagement_rate,
        "ingestion succeeded"
    );
    Ok(IngestOutcome::Ingested(report))
}

async fn collect(
    ctx: &IngestContext,
    credentials: &Credentials,
    influencer_id: i64,
) -> Result<(InfluencerInsights, IngestReport), IngestError> {
    let audience = fetch_audience(&ctx.graph, credentials, influencer_id).await?;

    let mut crawler = Crawler::new(MediaFeedSource::new(&ctx.graph, credentials), ctx.max_pages);
    let followers = audience.followers_count;
    let aggregate = aggregate_crawl(&mut crawler, ctx.post_cap, |_| Ok(followers))
        .await
        .map_err(|e| IngestError::from_graph(influencer_id, Stage::Media, e))?;

    let report = IngestReport {
        influencer_id,
        total_followers: followers,
        posts_considered: aggregate.posts_considered,
        pages_fetched: crawler.pages_fetched(),
        engagement_rate: aggregate.engagement_rate,
    };
    Ok((merge(influencer_id, audience, aggregate), report))
}

fn merge(
    influencer_id: i64,
    audience: AudienceProfile,
    aggregate: AggregateResult,
) -> InfluencerInsights {
    InfluencerInsights {
        influencer_id,
        total_followers: audience.followers_count,
        profile_picture: audience.profile_picture_url,
        cities_by_audience_share: audience.cities_by_audience_share,
        gender_split: audience.gender_split,
        top_gender: audience.top_gender,
        age_buckets: audience.age_buckets,
        top_age_bucket: audience.top_age_bucket,
        hashtags: aggregate.hashtags,
        mentions: aggregate.mentions,
        engagement_rate: aggregate.engagement_rate,
        posts: aggregate.posts,
        collected_at: Utc::now(),
    }
}

/// Engagement rate computed from an influencer's full public media history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementRatePayload {
    pub influencer_id: i64,
    pub username: String,
    pub followers_count: u64,
    pub posts_considered: usize,
    pub total_engagement: u64,
    pub engagement_rate: f64,
}

/// Computes the uncapped engagement rate of an influencer through
/// `business_discovery`, requesting only follower and engagement counts.
///
/// Uses `ctx.discovery_account` when set, otherwise the influencer's own
/// credentials. Returns `Ok(None)` when neither is available. Nothing is
/// persisted.
///
/// # Errors
///
/// - [`IngestError::NoInstagramChannel`] if no channel links to Instagram.
/// - [`IngestError::DeadlineExceeded`] if the crawl outlives `ctx.deadline`.
/// - Any Graph failure, attributed to [`Stage::Discovery`].
pub async fn simple_engagement_rate(
    ctx: &IngestContext,
    influencer: &Influencer,
) -> Result<Option<EngagementRatePayload>, IngestError> {
    let influencer_id = influencer.id;
    let username = influencer
        .instagram_username()
        .ok_or(IngestError::NoInstagramChannel { influencer_id })?;
    let Some(credentials) = ctx
        .discovery_account
        .clone()
        .or_else(|| influencer.credentials())
    else {
        tracing::info!(influencer_id, "no discovery credentials; skipping rate");
        return Ok(None);
    };

    let crawl = async {
        let mut crawler = Crawler::new(
            DiscoverySource::new(&ctx.graph, &credentials, &username),
            ctx.max_pages,
        );
        let aggregate = aggregate_crawl(&mut crawler, None, |source| {
            source
                .followers_count()
                .ok_or_else(|| GraphError::MissingData {
                    context: "business discovery followers_count".to_owned(),
                })
        })
        .await
        .map_err(|e| IngestError::from_graph(influencer_id, Stage::Discovery, e))?;
        let followers_count = crawler.source().followers_count().unwrap_or_default();
        Ok::<_, IngestError>((aggregate, followers_count))
    };

    let (aggregate, followers_count) = with_deadline(ctx, influencer_id, crawl)
        .await
        .inspect_err(log_failure)?;

    tracing::info!(
        influencer_id,
        posts_considered = aggregate.posts_considered,
        engagement_rate = aggregate.engagement_rate,
        "simple engagement rate computed"
    );

    Ok(Some(EngagementRatePayload {
        influencer_id,
        username,
        followers_count,
        posts_considered: aggregate.posts_considered,
        total_engagement: aggregate.total_engagement,
        engagement_rate: aggregate.engagement_rate,
    }))
}

async fn with_deadline<T>(
    ctx: &IngestContext,
    influencer_id: i64,
    fut: impl std::future::Future<Output = Result<T, IngestError>>,
) -> Result<T, IngestError> {
    tokio::time::timeout(ctx.deadline, fut)
        .await
        .unwrap_or_else(|_| {
            Err(IngestError::DeadlineExceeded {
                influencer_id,
                secs: ctx.deadline.as_secs(),
            })
        })
}

fn log_failure(err: &IngestError) {
    tracing::error!(
        influencer_id = err.influencer_id(),
        stage = err.stage().map(|s| s.as_str()),
        kind = ?err.kind(),
        error = %err,
        "ingestion failed"
    );
}
