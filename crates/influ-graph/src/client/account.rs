//! Non-paginated account lookups: basic profile and lifetime audience insights.

use std::collections::BTreeMap;

use influ_core::Credentials;

use crate::error::GraphError;
use crate::types::{BasicProfile, InsightsResponse};

use super::GraphClient;

const PROFILE_FIELDS: &str = "profile_picture_url,followers_count";

impl GraphClient {
    /// Fetches the follower count and profile picture of an account.
    ///
    /// Presence of the individual fields is not checked here; callers decide
    /// which absences are terminal.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`GraphClient::get_json`].
    pub async fn fetch_basic_profile(
        &self,
        credentials: &Credentials,
    ) -> Result<BasicProfile, GraphError> {
        let url = self.endpoint(
            &credentials.account_id,
            &[("fields", PROFILE_FIELDS)],
            &credentials.access_token,
        )?;
        self.get_json(&url, "basic profile").await
    }

    /// Fetches a lifetime audience insight whose value is a string-keyed
    /// count map, e.g. `audience_city` or `audience_gender_age`.
    ///
    /// Returns the first value of the first insight.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Deserialize`] if the response has no `data` envelope.
    /// - [`GraphError::MissingData`] if `data` or its values are empty.
    /// - Any error from [`GraphClient::get_json`].
    pub async fn fetch_audience_insight(
        &self,
        credentials: &Credentials,
        metric: &str,
    ) -> Result<BTreeMap<String, u64>, GraphError> {
        let url = self.endpoint(
            &format!("{}/insights", credentials.account_id),
            &[("metric", metric), ("period", "lifetime")],
            &credentials.access_token,
        )?;
        let context = format!("{metric} insight");
        let response: InsightsResponse<BTreeMap<String, u64>> =
            self.get_json(&url, &context).await?;

        response
            .first_value()
            .cloned()
            .ok_or(GraphError::MissingData { context })
    }
}
