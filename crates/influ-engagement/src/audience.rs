//! Non-paginated profile and audience lookups, normalized for storage.

use std::collections::BTreeMap;

use influ_core::{CityShare, Credentials, GenderSplit};
use influ_graph::GraphClient;

use crate::error::{IngestError, Stage};

pub const AUDIENCE_CITY_METRIC: &str = "audience_city";
pub const AUDIENCE_GENDER_AGE_METRIC: &str = "audience_gender_age";

const MALE_CODE: &str = "M";

/// Follower count, picture and demographic breakdown of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceProfile {
    pub followers_count: u64,
    pub profile_picture_url: String,
    /// Ordered by descending share.
    pub cities_by_audience_share: Vec<CityShare>,
    pub gender_split: GenderSplit,
    pub age_buckets: BTreeMap<String, u64>,
    pub top_gender: String,
    pub top_age_bucket: String,
}

/// `audience_gender_age` folded into gender totals and age buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenderAgeBreakdown {
    pub gender_split: GenderSplit,
    pub age_buckets: BTreeMap<String, u64>,
    pub top_gender: &'static str,
    /// `None` only for an empty input.
    pub top_age_bucket: Option<String>,
}

/// Sorts a city value map by descending share, then by city name.
#[must_use]
pub fn normalize_cities(values: &BTreeMap<String, u64>) -> Vec<CityShare> {
    let mut cities: Vec<CityShare> = values
        .iter()
        .map(|(city, share)| CityShare {
            city: city.clone(),
            share: *share,
        })
        .collect();
    cities.sort_by(|a, b| b.share.cmp(&a.share).then_with(|| a.city.cmp(&b.city)));
    cities
}

/// Splits `"<gender>.<age>"` keys on their first `.` and accumulates both
/// halves.
///
/// Gender code `M` counts as male and every other code as female. The top age
/// bucket is the one with the highest count, the smallest key on ties.
///
/// # Errors
///
/// Returns the offending key when it has no `.` separator.
pub fn split_gender_age(values: &BTreeMap<String, u64>) -> Result<GenderAgeBreakdown, String> {
    let mut gender_split = GenderSplit::default();
    let mut age_buckets: BTreeMap<String, u64> = BTreeMap::new();

    for (key, count) in values {
        let Some((gender, age)) = key.split_once('.') else {
            return Err(key.clone());
        };
        if gender == MALE_CODE {
            gender_split.male += count;
        } else {
            gender_split.female += count;
        }
        *age_buckets.entry(age.to_owned()).or_default() += count;
    }

    // BTreeMap iterates in key order; keep the first maximum.
    let top_age_bucket = age_buckets
        .iter()
        .fold(None::<(&String, u64)>, |best, (bucket, &count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((bucket, count)),
        })
        .map(|(bucket, _)| bucket.clone());

    Ok(GenderAgeBreakdown {
        top_gender: gender_split.top_gender(),
        gender_split,
        age_buckets,
        top_age_bucket,
    })
}

/// Runs the three account lookups for `credentials`: basic profile, city
/// distribution and gender/age distribution.
///
/// # Errors
///
/// - [`IngestError::UpstreamDataMissing`] when the follower count or picture
///   URL is absent, or either insight is empty.
/// - [`IngestError::MalformedResponse`] when an insight lacks its `data`
///   envelope or a gender/age key cannot be split.
/// - [`IngestError::Upstream`] on transport failure.
pub async fn fetch_audience(
    graph: &GraphClient,
    credentials: &Credentials,
    influencer_id: i64,
) -> Result<AudienceProfile, IngestError> {
    let profile = graph
        .fetch_basic_profile(credentials)
        .await
        .map_err(|e| IngestError::from_graph(influencer_id, Stage::Profile, e))?;
    let missing = |field: &str| IngestError::UpstreamDataMissing {
        influencer_id,
        stage: Stage::Profile,
        field: field.to_owned(),
    };
    let followers_count = profile
        .followers_count
        .ok_or_else(|| missing("followers_count"))?;
    let profile_picture_url = profile
        .profile_picture_url
        .ok_or_else(|| missing("profile_picture_url"))?;

    let cities = fetch_insight(
        graph,
        credentials,
        influencer_id,
        Stage::AudienceCity,
        AUDIENCE_CITY_METRIC,
    )
    .await?;
    let cities_by_audience_share = normalize_cities(&cities);

    let gender_age = fetch_insight(
        graph,
        credentials,
        influencer_id,
        Stage::AudienceGenderAge,
        AUDIENCE_GENDER_AGE_METRIC,
    )
    .await?;
    let breakdown = split_gender_age(&gender_age).map_err(|key| IngestError::MalformedResponse {
        influencer_id,
        stage: Stage::AudienceGenderAge,
        reason: format!("key '{key}' is not of the form <gender>.<age>"),
    })?;
    let top_age_bucket =
        breakdown
            .top_age_bucket
            .ok_or_else(|| IngestError::UpstreamDataMissing {
                influencer_id,
                stage: Stage::AudienceGenderAge,
                field: "age buckets".to_owned(),
            })?;

    tracing::debug!(
        influencer_id,
        followers_count,
        cities = cities_by_audience_share.len(),
        "audience fetched"
    );

    Ok(AudienceProfile {
        followers_count,
        profile_picture_url,
        cities_by_audience_share,
        gender_split: breakdown.gender_split,
        age_buckets: breakdown.age_buckets,
        top_gender: breakdown.top_gender.to_owned(),
        top_age_bucket,
    })
}

/// Fetches one audience insight, treating an empty value map as missing data.
async fn fetch_insight(
    graph: &GraphClient,
    credentials: &Credentials,
    influencer_id: i64,
    stage: Stage,
    metric: &str,
) -> Result<BTreeMap<String, u64>, IngestError> {
    let values = graph
        .fetch_audience_insight(credentials, metric)
        .await
        .map_err(|e| IngestError::from_graph(influencer_id, stage, e))?;

    if values.is_empty() {
        return Err(IngestError::UpstreamDataMissing {
            influencer_id,
            stage,
            field: format!("{metric} values"),
        });
    }
    Ok(values)
}
