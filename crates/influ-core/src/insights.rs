//! Derived insight records shared by the engagement pipeline and the store.
//!
//! These are the JSON shapes persisted in the `influencer_insights` JSONB
//! columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One city of the audience breakdown with its share of followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityShare {
    pub city: String,
    pub share: u64,
}

/// Follower counts split by gender code (`M` is male, every other code is
/// counted as female).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderSplit {
    pub male: u64,
    pub female: u64,
}

impl GenderSplit {
    /// `"male"` only when male strictly exceeds female.
    #[must_use]
    pub fn top_gender(&self) -> &'static str {
        if self.male > self.female {
            "male"
        } else {
            "female"
        }
    }
}

/// A media post as stored alongside the influencer's insights, with the
/// entities found in its caption and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub timestamp: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub like_count: Option<u64>,
    pub comments_count: Option<u64>,
    pub insights: BTreeMap<String, i64>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_gender_ties_favour_female() {
        assert_eq!(GenderSplit { male: 5, female: 5 }.top_gender(), "female");
        assert_eq!(GenderSplit { male: 6, female: 5 }.top_gender(), "male");
        assert_eq!(GenderSplit::default().top_gender(), "female");
    }

    #[test]
    fn post_summary_serializes_snake_case_fields() {
        let post = PostSummary {
            id: "p1".to_owned(),
            timestamp: None,
            media_type: Some("IMAGE".to_owned()),
            media_url: None,
            caption: None,
            like_count: Some(3),
            comments_count: None,
            insights: BTreeMap::from([("reach".to_owned(), 40)]),
            hashtags: vec!["sun".to_owned()],
            mentions: vec![],
        };
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["like_count"], 3);
        assert_eq!(value["insights"]["reach"], 40);
        assert!(value["comments_count"].is_null());
    }
}
