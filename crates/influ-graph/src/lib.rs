//! Client for the Instagram Graph API: account lookups, audience insights,
//! and cursor-paginated media crawls.

pub mod client;
pub mod error;
pub mod pagination;
pub mod sources;
pub mod types;

pub use client::{redact_token, GraphClient};
pub use error::GraphError;
pub use pagination::{Crawler, Page, PageRequest, PageSource};
pub use sources::{DiscoverySource, MediaFeedSource};
pub use types::{
    BasicProfile, BusinessDiscovery, Comment, CommentList, Cursors, DiscoveryResponse, Insight,
    InsightValue, InsightsResponse, MediaPage, MediaPost, Paging, PostInsights,
};
