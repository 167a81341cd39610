//! [`PageSource`] implementations for the two media crawls.

use influ_core::Credentials;
use reqwest::Url;

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::pagination::{Page, PageRequest, PageSource};
use crate::types::{DiscoveryResponse, MediaPage, MediaPost};

/// Fields requested for each post of the enrichment crawl.
pub const MEDIA_FIELDS: &str = "media_type,media_url,timestamp,comments,caption,like_count,\
comments_count,insights.metric(impressions,reach,engagement,saved)";

/// The account's own media feed, `GET {account}/media`, followed through
/// `paging.next` URLs.
pub struct MediaFeedSource<'a> {
    client: &'a GraphClient,
    credentials: &'a Credentials,
}

impl<'a> MediaFeedSource<'a> {
    #[must_use]
    pub fn new(client: &'a GraphClient, credentials: &'a Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn request_url(&self, request: &PageRequest) -> Result<Url, GraphError> {
        let path = format!("{}/media", self.credentials.account_id);
        match request {
            PageRequest::Seed => self.client.endpoint(
                &path,
                &[("fields", MEDIA_FIELDS)],
                &self.credentials.access_token,
            ),
            PageRequest::After(cursor) => self.client.endpoint(
                &path,
                &[("fields", MEDIA_FIELDS), ("after", cursor.as_str())],
                &self.credentials.access_token,
            ),
            PageRequest::Url(url) => Ok(url.clone()),
        }
    }
}

impl PageSource for MediaFeedSource<'_> {
    type Item = MediaPost;

    async fn fetch(&mut self, request: &PageRequest) -> Result<Page<MediaPost>, GraphError> {
        let url = self.request_url(request)?;
        let page: MediaPage = self.client.get_json(&url, "media feed").await?;
        let next = page.next_url().map(parse_next_url).transpose()?;

        Ok(Page {
            items: page.data,
            next,
        })
    }
}

/// Another account's public media, seen through
/// `GET {querying account}?fields=business_discovery.username(<u>){...}`.
///
/// Requests only follower and engagement counts. The first page also yields
/// the follower count, available afterwards via
/// [`DiscoverySource::followers_count`].
pub struct DiscoverySource<'a> {
    client: &'a GraphClient,
    credentials: &'a Credentials,
    username: String,
    followers_count: Option<u64>,
}

impl<'a> DiscoverySource<'a> {
    /// `credentials` belong to the querying business account, which need not
    /// be the account named by `username`.
    #[must_use]
    pub fn new(client: &'a GraphClient, credentials: &'a Credentials, username: &str) -> Self {
        Self {
            client,
            credentials,
            username: username.to_owned(),
            followers_count: None,
        }
    }

    /// Follower count reported by the seed page, once fetched.
    #[must_use]
    pub fn followers_count(&self) -> Option<u64> {
        self.followers_count
    }

    fn fields(&self, request: &PageRequest) -> String {
        let username = &self.username;
        match request {
            PageRequest::After(cursor) => format!(
                "business_discovery.username({username}){{media.after({cursor}){{comments_count,like_count}}}}"
            ),
            PageRequest::Seed | PageRequest::Url(_) => format!(
                "business_discovery.username({username}){{followers_count,media{{comments_count,like_count}}}}"
            ),
        }
    }
}

impl PageSource for DiscoverySource<'_> {
    type Item = MediaPost;

    async fn fetch(&mut self, request: &PageRequest) -> Result<Page<MediaPost>, GraphError> {
        let url = match request {
            PageRequest::Url(url) => url.clone(),
            PageRequest::Seed | PageRequest::After(_) => {
                let fields = self.fields(request);
                self.client.endpoint(
                    &self.credentials.account_id,
                    &[("fields", fields.as_str())],
                    &self.credentials.access_token,
                )?
            }
        };
        let context = format!("business discovery for {}", self.username);
        let response: DiscoveryResponse = self.client.get_json(&url, &context).await?;
        let discovery = response.business_discovery;

        if matches!(request, PageRequest::Seed) {
            let followers = discovery
                .followers_count
                .ok_or_else(|| GraphError::MissingData {
                    context: format!("{context}: followers_count"),
                })?;
            self.followers_count = Some(followers);
        }

        let media = discovery.media.ok_or_else(|| GraphError::MissingData {
            context: format!("{context}: media"),
        })?;
        let next = media
            .after_cursor()
            .map(|cursor| PageRequest::After(cursor.to_owned()));

        Ok(Page {
            items: media.data,
            next,
        })
    }
}

fn parse_next_url(raw: &str) -> Result<PageRequest, GraphError> {
    Url::parse(raw)
        .map(PageRequest::Url)
        .map_err(|e| GraphError::InvalidUrl {
            url: raw.to_owned(),
            reason: e.to_string(),
        })
}
