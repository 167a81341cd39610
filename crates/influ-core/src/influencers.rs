use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const INSTAGRAM_HOST: &str = "instagram.com/";

/// A social channel listed on an influencer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub platform: String,
    pub link: String,
}

/// An influencer identity as stored in the `influencers` table.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Influencer {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Instagram business account id used for Graph API lookups.
    pub social_account_id: Option<String>,
    pub access_token: Option<String>,
    pub channels: Vec<Channel>,
}

impl std::fmt::Debug for Influencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Influencer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("social_account_id", &self.social_account_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("channels", &self.channels)
            .finish()
    }
}

/// Graph API credentials for one account: the account id to query and the
/// token that authorizes it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

impl Influencer {
    /// Returns the influencer's credentials when both the account id and the
    /// access token are present and non-blank.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let account_id = self
            .social_account_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let access_token = self
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some(Credentials {
            account_id: account_id.to_owned(),
            access_token: access_token.to_owned(),
        })
    }

    /// Instagram username resolved from this influencer's channels.
    #[must_use]
    pub fn instagram_username(&self) -> Option<String> {
        instagram_username(&self.channels)
    }
}

/// Resolve the Instagram username from a list of channels.
///
/// Picks the first channel whose link contains `instagram.com/` and strips the
/// host prefix, any slashes and the query string:
/// `https://www.instagram.com/some.user/?hl=en` yields `some.user`.
#[must_use]
pub fn instagram_username(channels: &[Channel]) -> Option<String> {
    channels.iter().find_map(|channel| {
        let (_, rest) = channel.link.split_once(INSTAGRAM_HOST)?;
        let path = rest.split(['?', '#']).next().unwrap_or(rest);
        let username: String = path.chars().filter(|&c| c != '/').collect();
        (!username.is_empty()).then_some(username)
    })
}

/// One entry of `config/influencers.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluencerConfig {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub social_account_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
pub struct InfluencersFile {
    pub influencers: Vec<InfluencerConfig>,
}

/// Load and validate the influencer identities from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_influencers(path: &Path) -> Result<InfluencersFile, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::InfluencersFileIo {
            path: path.display().to_string(),
            source: e,
        })?;

    let file: InfluencersFile = serde_yaml::from_str(&content)?;
    validate_influencers(&file)?;
    Ok(file)
}

fn validate_influencers(file: &InfluencersFile) -> Result<(), ConfigError> {
    let mut seen_emails = HashSet::new();

    for influencer in &file.influencers {
        if influencer.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "influencer name must be non-empty".to_string(),
            ));
        }

        let email = influencer.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ConfigError::Validation(format!(
                "influencer '{}' has an invalid email '{}'",
                influencer.name, influencer.email
            )));
        }

        if !seen_emails.insert(email) {
            return Err(ConfigError::Validation(format!(
                "duplicate influencer email: '{}'",
                influencer.email
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "influencers_test.rs"]
mod tests;
