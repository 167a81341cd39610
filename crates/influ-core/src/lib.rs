pub mod app_config;
pub mod config;
pub mod influencers;
pub mod insights;

pub use app_config::{AppConfig, DiscoveryAccount, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use influencers::{
    instagram_username, load_influencers, Channel, Credentials, Influencer, InfluencerConfig,
    InfluencersFile,
};
pub use insights::{CityShare, GenderSplit, PostSummary};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read influencers file {path}: {source}")]
    InfluencersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse influencers file: {0}")]
    InfluencersFileParse(#[from] serde_yaml::Error),

    #[error("influencers file validation failed: {0}")]
    Validation(String),
}
