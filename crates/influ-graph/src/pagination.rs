//! Cursor-driven crawl over paginated Graph edges.
//!
//! Graph feeds carry their continuation in the body:
//!
//! ```text
//! { "data": [...], "paging": { "cursors": { "after": "QVFI..." }, "next": "https://graph..." } }
//! ```
//!
//! The media feed is followed through the full `paging.next` URL; business
//! discovery only exposes `paging.cursors.after`, which the source folds back
//! into a `media.after(<cursor>)` field selection. [`PageSource`] hides that
//! difference from [`Crawler`].

use std::future::Future;

use reqwest::Url;

use crate::error::GraphError;

/// What to fetch next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// The first page, built by the source from its own parameters.
    Seed,
    /// A full next-page URL taken from `paging.next`.
    Url(Url),
    /// An opaque `after` cursor taken from `paging.cursors.after`.
    After(String),
}

/// One fetched page: its items and where to go next, if anywhere.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageRequest>,
}

/// A paginated resource the [`Crawler`] can walk.
pub trait PageSource {
    type Item;

    /// Issues one request and decodes it into a page.
    fn fetch(
        &mut self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Page<Self::Item>, GraphError>> + Send;
}

/// Lazily walks a [`PageSource`] from its seed request.
///
/// Each call to [`Crawler::next_page`] issues at most one request, so callers
/// that stop early never fetch pages they do not consume. The crawl ends after
/// a page with no `next`, after the first page with no items, or on the first
/// error. Nothing is retried; restarting means building a new crawler.
pub struct Crawler<S: PageSource> {
    source: S,
    pending: Option<PageRequest>,
    pages_fetched: usize,
    max_pages: usize,
}

impl<S: PageSource> Crawler<S> {
    /// `max_pages` bounds the crawl against cycling cursors; exceeding it is
    /// an error, not a silent stop.
    pub fn new(source: S, max_pages: usize) -> Self {
        Self {
            source,
            pending: Some(PageRequest::Seed),
            pages_fetched: 0,
            max_pages,
        }
    }

    /// Fetches the next page, or returns `Ok(None)` once the crawl is over.
    ///
    /// # Errors
    ///
    /// - [`GraphError::PaginationLimit`] when a further page is requested after
    ///   `max_pages` pages.
    /// - Any error from the source; the crawl is over afterwards.
    pub async fn next_page(&mut self) -> Result<Option<Page<S::Item>>, GraphError> {
        let Some(request) = self.pending.take() else {
            return Ok(None);
        };

        if self.pages_fetched >= self.max_pages {
            return Err(GraphError::PaginationLimit {
                max_pages: self.max_pages,
            });
        }

        let page = self.source.fetch(&request).await?;
        self.pages_fetched += 1;

        self.pending = if page.items.is_empty() {
            None
        } else {
            page.next.clone()
        };

        tracing::debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            has_next = self.pending.is_some(),
            "fetched page"
        );

        Ok(Some(page))
    }

    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_none()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
