//! The `influencer_insights` table and the write seam used by ingestion.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use influ_core::{CityShare, GenderSplit, PostSummary};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// The consolidated result of one ingestion, written as a single upsert.
///
/// Holds only the fields the ingestion pipeline owns; other columns of the
/// row are left untouched on conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluencerInsights {
    pub influencer_id: i64,
    pub total_followers: u64,
    pub profile_picture: String,
    pub cities_by_audience_share: Vec<CityShare>,
    pub gender_split: GenderSplit,
    pub top_gender: String,
    pub age_buckets: BTreeMap<String, u64>,
    pub top_age_bucket: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub engagement_rate: f64,
    pub posts: Vec<PostSummary>,
    pub collected_at: DateTime<Utc>,
}

/// Keyed update-or-insert of an influencer's insights.
///
/// Implementations must replace the previous document for the same
/// `influencer_id` so repeated ingestions are idempotent.
pub trait InsightStore {
    fn upsert_insights(
        &self,
        insights: &InfluencerInsights,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// [`InsightStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgInsightStore {
    pool: PgPool,
}

impl PgInsightStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl InsightStore for PgInsightStore {
    async fn upsert_insights(&self, insights: &InfluencerInsights) -> Result<(), DbError> {
        let total_followers =
            i64::try_from(insights.total_followers).map_err(|_| DbError::OutOfRange {
                column: "total_followers",
                value: insights.total_followers,
            })?;

        sqlx::query(
            "INSERT INTO influencer_insights ( \
                 influencer_id, total_followers, profile_picture, cities_by_audience_share, \
                 gender_split, top_gender, age_buckets, top_age_bucket, hashtags, mentions, \
                 engagement_rate, posts, collected_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (influencer_id) DO UPDATE SET \
                 total_followers = EXCLUDED.total_followers, \
                 profile_picture = EXCLUDED.profile_picture, \
                 cities_by_audience_share = EXCLUDED.cities_by_audience_share, \
                 gender_split = EXCLUDED.gender_split, \
                 top_gender = EXCLUDED.top_gender, \
                 age_buckets = EXCLUDED.age_buckets, \
                 top_age_bucket = EXCLUDED.top_age_bucket, \
                 hashtags = EXCLUDED.hashtags, \
                 mentions = EXCLUDED.mentions, \
                 engagement_rate = EXCLUDED.engagement_rate, \
                 posts = EXCLUDED.posts, \
                 collected_at = EXCLUDED.collected_at, \
                 updated_at = NOW()",
        )
        .bind(insights.influencer_id)
        .bind(total_followers)
        .bind(&insights.profile_picture)
        .bind(Json(&insights.cities_by_audience_share))
        .bind(Json(&insights.gender_split))
        .bind(&insights.top_gender)
        .bind(Json(&insights.age_buckets))
        .bind(&insights.top_age_bucket)
        .bind(&insights.hashtags)
        .bind(&insights.mentions)
        .bind(insights.engagement_rate)
        .bind(Json(&insights.posts))
        .bind(insights.collected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
