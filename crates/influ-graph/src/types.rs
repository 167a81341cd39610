//! Wire types for the Graph API responses the pipeline consumes.
//!
//! Only fields the pipeline reads are modelled. Fields the API may omit are
//! `Option` or `#[serde(default)]`; envelopes the pipeline requires (`data`,
//! `business_discovery`) are mandatory so a missing envelope fails to decode.

use std::collections::BTreeMap;

use serde::Deserialize;

/// `GET {account}?fields=profile_picture_url,followers_count`
#[derive(Debug, Clone, Deserialize)]
pub struct BasicProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

/// `GET {account}/insights?metric=...` and the nested `insights` edge on
/// media objects.
#[derive(Debug, Clone, Deserialize)]
pub struct InsightsResponse<V> {
    pub data: Vec<Insight<V>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Insight<V> {
    pub name: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default = "Vec::new")]
    pub values: Vec<InsightValue<V>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightValue<V> {
    pub value: V,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl<V> InsightsResponse<V> {
    /// The first value of the first insight, which is where lifetime
    /// audience metrics live.
    #[must_use]
    pub fn first_value(&self) -> Option<&V> {
        self.data.first()?.values.first().map(|v| &v.value)
    }
}

/// Per-post insights (`impressions`, `reach`, `engagement`, `saved`).
pub type PostInsights = InsightsResponse<i64>;

/// One page of the media feed, or the `media` edge of a business discovery
/// lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPage {
    pub data: Vec<MediaPost>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Option<Cursors>,
    /// Full URL of the next page, token included.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

impl MediaPage {
    #[must_use]
    pub fn next_url(&self) -> Option<&str> {
        self.paging.as_ref()?.next.as_deref()
    }

    #[must_use]
    pub fn after_cursor(&self) -> Option<&str> {
        self.paging.as_ref()?.cursors.as_ref()?.after.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPost {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub comments_count: Option<u64>,
    #[serde(default)]
    pub comments: Option<CommentList>,
    #[serde(default)]
    pub insights: Option<PostInsights>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentList {
    #[serde(default)]
    pub data: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

impl MediaPost {
    /// Likes plus comments, or `None` unless both counts were returned.
    #[must_use]
    pub fn engagement(&self) -> Option<u64> {
        Some(self.like_count?.saturating_add(self.comments_count?))
    }

    pub fn comment_texts(&self) -> impl Iterator<Item = &str> {
        self.comments
            .iter()
            .flat_map(|c| c.data.iter())
            .map(|c| c.text.as_str())
    }

    /// Insight metric name to its first reported value.
    #[must_use]
    pub fn insight_values(&self) -> BTreeMap<String, i64> {
        self.insights
            .iter()
            .flat_map(|i| i.data.iter())
            .filter_map(|insight| {
                insight
                    .values
                    .first()
                    .map(|v| (insight.name.clone(), v.value))
            })
            .collect()
    }
}

/// `GET {account}?fields=business_discovery.username(<u>){...}`
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryResponse {
    pub business_discovery: BusinessDiscovery,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessDiscovery {
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub media: Option<MediaPage>,
}
