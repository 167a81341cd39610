use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Account used to issue `business_discovery` lookups on behalf of other
/// influencers. When unset, each influencer's own credentials are used.
#[derive(Clone, PartialEq, Eq)]
pub struct DiscoveryAccount {
    pub account_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for DiscoveryAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryAccount")
            .field("account_id", &self.account_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub influencers_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub graph_base_url: String,
    pub graph_request_timeout_secs: u64,
    pub graph_user_agent: String,
    /// Posts considered by the enrichment crawl. `0` disables the cap.
    pub ingest_post_cap: usize,
    pub ingest_max_pages: usize,
    pub ingest_deadline_secs: u64,
    pub ingest_max_concurrent: usize,
    pub discovery_account: Option<DiscoveryAccount>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("influencers_path", &self.influencers_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("graph_base_url", &self.graph_base_url)
            .field(
                "graph_request_timeout_secs",
                &self.graph_request_timeout_secs,
            )
            .field("graph_user_agent", &self.graph_user_agent)
            .field("ingest_post_cap", &self.ingest_post_cap)
            .field("ingest_max_pages", &self.ingest_max_pages)
            .field("ingest_deadline_secs", &self.ingest_deadline_secs)
            .field("ingest_max_concurrent", &self.ingest_max_concurrent)
            .field("discovery_account", &self.discovery_account)
            .finish()
    }
}

impl AppConfig {
    /// The enrichment post cap as an `Option`, with `0` meaning "uncapped".
    #[must_use]
    pub fn post_cap(&self) -> Option<usize> {
        (self.ingest_post_cap > 0).then_some(self.ingest_post_cap)
    }
}
