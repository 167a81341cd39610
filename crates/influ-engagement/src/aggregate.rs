//! Engagement aggregation over a stream of media posts.

use std::collections::HashMap;

use influ_core::PostSummary;
use influ_graph::{Crawler, GraphError, MediaPost, PageSource};

use crate::entities::{extract_all, HASHTAG_SIGIL, MENTION_SIGIL};

/// Occurrence counts of entities, keyed case-insensitively.
///
/// The display form of an entity is its first-seen spelling.
#[derive(Debug, Clone, Default)]
pub struct EntityTally {
    counts: HashMap<String, (String, u64)>,
}

impl EntityTally {
    pub fn record(&mut self, entity: &str) {
        self.counts
            .entry(entity.to_lowercase())
            .or_insert_with(|| (entity.to_owned(), 0))
            .1 += 1;
    }

    #[must_use]
    pub fn count(&self, entity: &str) -> u64 {
        self.counts
            .get(&entity.to_lowercase())
            .map_or(0, |(_, count)| *count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Distinct entities by descending count. The order among equal counts is
    /// not part of the contract.
    #[must_use]
    pub fn ranked(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.counts.iter().collect();
        entries.sort_by(|(ka, (_, ca)), (kb, (_, cb))| cb.cmp(ca).then_with(|| ka.cmp(kb)));
        entries
            .into_iter()
            .map(|(_, (display, _))| display.clone())
            .collect()
    }
}

/// Output of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub total_engagement: u64,
    pub posts_considered: usize,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub posts: Vec<PostSummary>,
    pub engagement_rate: f64,
}

/// `total / posts / followers * 100`, or `0.0` when either divisor is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(total_engagement: u64, posts_considered: usize, followers: u64) -> f64 {
    if posts_considered == 0 || followers == 0 {
        return 0.0;
    }
    total_engagement as f64 / posts_considered as f64 / followers as f64 * 100.0
}

/// Accumulates posts in delivery order until an optional cap is reached.
#[derive(Debug, Clone)]
pub struct EngagementAggregator {
    cap: Option<usize>,
    total_engagement: u64,
    hashtags: EntityTally,
    mentions: EntityTally,
    posts: Vec<PostSummary>,
}

impl EngagementAggregator {
    /// `cap = None` aggregates every post pushed.
    #[must_use]
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cap,
            total_engagement: 0,
            hashtags: EntityTally::default(),
            mentions: EntityTally::default(),
            posts: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.posts.len() >= cap)
    }

    #[must_use]
    pub fn posts_considered(&self) -> usize {
        self.posts.len()
    }

    /// Adds one post. Returns `false`, leaving the aggregate unchanged, once
    /// the cap has been reached.
    ///
    /// A post without both `like_count` and `comments_count` still counts as
    /// considered, contributing zero engagement.
    pub fn push(&mut self, post: &MediaPost) -> bool {
        if self.is_full() {
            return false;
        }

        self.total_engagement = self
            .total_engagement
            .saturating_add(post.engagement().unwrap_or(0));

        let mut hashtags = EntityTally::default();
        let mut mentions = EntityTally::default();
        for text in post.caption.as_deref().into_iter().chain(post.comment_texts()) {
            for tag in extract_all(HASHTAG_SIGIL, text) {
                self.hashtags.record(&tag);
                hashtags.record(&tag);
            }
            for mention in extract_all(MENTION_SIGIL, text) {
                self.mentions.record(&mention);
                mentions.record(&mention);
            }
        }

        self.posts.push(PostSummary {
            id: post.id.clone(),
            timestamp: post.timestamp.clone(),
            media_type: post.media_type.clone(),
            media_url: post.media_url.clone(),
            caption: post.caption.clone(),
            like_count: post.like_count,
            comments_count: post.comments_count,
            insights: post.insight_values(),
            hashtags: hashtags.ranked(),
            mentions: mentions.ranked(),
        });
        true
    }

    #[must_use]
    pub fn finish(self, followers: u64) -> AggregateResult {
        let posts_considered = self.posts.len();
        AggregateResult {
            total_engagement: self.total_engagement,
            posts_considered,
            hashtags: self.hashtags.ranked(),
            mentions: self.mentions.ranked(),
            engagement_rate: engagement_rate(self.total_engagement, posts_considered, followers),
            posts: self.posts,
        }
    }
}

/// Drives a crawl into an aggregator, pulling pages only while the cap has
/// room.
///
/// `followers` is read once the crawl is over, so sources that learn the
/// follower count while crawling (business discovery) can supply it.
///
/// # Errors
///
/// Returns the first [`GraphError`] raised by the crawl.
pub async fn aggregate_crawl<S, F>(
    crawler: &mut Crawler<S>,
    cap: Option<usize>,
    followers: F,
) -> Result<AggregateResult, GraphError>
where
    S: PageSource<Item = MediaPost>,
    F: FnOnce(&S) -> Result<u64, GraphError>,
{
    let mut aggregator = EngagementAggregator::new(cap);

    while !aggregator.is_full() {
        let Some(page) = crawler.next_page().await? else {
            break;
        };
        for post in &page.items {
            if !aggregator.push(post) {
                break;
            }
        }
    }

    tracing::debug!(
        pages = crawler.pages_fetched(),
        posts_considered = aggregator.posts_considered(),
        "media crawl aggregated"
    );

    let followers = followers(crawler.source())?;
    Ok(aggregator.finish(followers))
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
