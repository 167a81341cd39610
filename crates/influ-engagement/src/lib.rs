//! Engagement ingestion for Instagram influencers.
//!
//! Fetches an influencer's profile and audience insights, crawls their media
//! feed, extracts hashtags and mentions, computes the engagement rate, and
//! persists the merged result through an [`influ_db::InsightStore`].

pub mod aggregate;
pub mod audience;
pub mod batch;
pub mod entities;
pub mod error;
pub mod pipeline;

pub use aggregate::{
    aggregate_crawl, engagement_rate, AggregateResult, EngagementAggregator, EntityTally,
};
pub use audience::{
    fetch_audience, normalize_cities, split_gender_age, AudienceProfile, GenderAgeBreakdown,
};
pub use batch::{run_batch, BatchReport, IngestFailure};
pub use entities::{extract, extract_all, Entities};
pub use error::{ErrorKind, IngestError, Stage};
pub use pipeline::{
    ingest, simple_engagement_rate, EngagementRatePayload, IngestContext, IngestOutcome,
    IngestReport,
};
