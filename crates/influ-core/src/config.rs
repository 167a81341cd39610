use crate::app_config::{AppConfig, DiscoveryAccount, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("INFLU_ENV", "development"))?;
    let log_level = or_default("INFLU_LOG_LEVEL", "info");
    let influencers_path = PathBuf::from(or_default(
        "INFLU_INFLUENCERS_PATH",
        "./config/influencers.yaml",
    ));

    let db_max_connections = parse_u32("INFLU_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("INFLU_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("INFLU_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let graph_base_url = or_default("INFLU_GRAPH_BASE_URL", "https://graph.facebook.com/v7.0/");
    let graph_request_timeout_secs = parse_u64("INFLU_GRAPH_REQUEST_TIMEOUT_SECS", "30")?;
    let graph_user_agent = or_default("INFLU_GRAPH_USER_AGENT", "influ/0.1 (engagement-ingest)");

    let ingest_post_cap = parse_usize("INFLU_INGEST_POST_CAP", "25")?;
    let ingest_max_pages = parse_usize("INFLU_INGEST_MAX_PAGES", "200")?;
    if ingest_max_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "INFLU_INGEST_MAX_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let ingest_deadline_secs = parse_u64("INFLU_INGEST_DEADLINE_SECS", "600")?;
    let ingest_max_concurrent = parse_usize("INFLU_INGEST_MAX_CONCURRENT", "1")?;

    let discovery_account = match (
        lookup("INFLU_DISCOVERY_ACCOUNT_ID").ok(),
        lookup("INFLU_DISCOVERY_ACCESS_TOKEN").ok(),
    ) {
        (Some(account_id), Some(access_token)) => Some(DiscoveryAccount {
            account_id,
            access_token,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(ConfigError::MissingEnvVar(
                "INFLU_DISCOVERY_ACCESS_TOKEN".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(ConfigError::MissingEnvVar(
                "INFLU_DISCOVERY_ACCOUNT_ID".to_string(),
            ))
        }
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        influencers_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        graph_base_url,
        graph_request_timeout_secs,
        graph_user_agent,
        ingest_post_cap,
        ingest_max_pages,
        ingest_deadline_secs,
        ingest_max_concurrent,
        discovery_account,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "INFLU_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
