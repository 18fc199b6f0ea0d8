use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment, DEFAULT_USER_AGENTS};
use crate::{ConfigError, MAX_PLACES_LIMIT};

/// Longest accepted `MAPSCOUT_RUN_DEADLINE_SECS` (one week).
pub const MAX_RUN_DEADLINE_SECS: u64 = 7 * 24 * 60 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
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
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let env = parse_environment(&or_default("MAPSCOUT_ENV", "development"));
    let log_level = or_default("MAPSCOUT_LOG_LEVEL", "info");
    let search_base_url = or_default(
        "MAPSCOUT_SEARCH_BASE_URL",
        "https://www.google.com/maps/search/",
    );

    let navigation_timeout_secs = parse_u64("MAPSCOUT_NAVIGATION_TIMEOUT_SECS", "30")?;
    let consent_timeout_secs = parse_u64("MAPSCOUT_CONSENT_TIMEOUT_SECS", "5")?;
    let feed_timeout_secs = parse_u64("MAPSCOUT_FEED_TIMEOUT_SECS", "10")?;
    let concurrency = parse_usize("MAPSCOUT_CONCURRENCY", "5")?.max(1);
    // More workers than places a run may return is never useful.
    let max_concurrency = usize::try_from(MAX_PLACES_LIMIT).unwrap_or(usize::MAX);
    if concurrency > max_concurrency {
        return Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_CONCURRENCY".to_string(),
            reason: format!("must be <= {max_concurrency}, got {concurrency}"),
        });
    }

    let scroll_pause_min_ms = parse_u64("MAPSCOUT_SCROLL_PAUSE_MIN_MS", "1000")?;
    let scroll_pause_max_ms = parse_u64("MAPSCOUT_SCROLL_PAUSE_MAX_MS", "2000")?;
    if scroll_pause_max_ms < scroll_pause_min_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_SCROLL_PAUSE_MAX_MS".to_string(),
            reason: format!(
                "must be >= MAPSCOUT_SCROLL_PAUSE_MIN_MS ({scroll_pause_min_ms}), got {scroll_pause_max_ms}"
            ),
        });
    }

    let stagnation_limit = parse_u32("MAPSCOUT_STAGNATION_LIMIT", "5")?.max(1);
    let max_scroll_iterations = parse_u32("MAPSCOUT_MAX_SCROLL_ITERATIONS", "200")?.max(1);
    let run_deadline_secs = parse_u64("MAPSCOUT_RUN_DEADLINE_SECS", "600")?;
    if run_deadline_secs > MAX_RUN_DEADLINE_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_RUN_DEADLINE_SECS".to_string(),
            reason: format!("must be <= {MAX_RUN_DEADLINE_SECS}, got {run_deadline_secs}"),
        });
    }
    let navigation_retries = parse_u32("MAPSCOUT_NAVIGATION_RETRIES", "1")?;
    let retry_backoff_base_ms = parse_u64("MAPSCOUT_RETRY_BACKOFF_BASE_MS", "500")?;

    let user_agents = lookup("MAPSCOUT_USER_AGENTS")
        .ok()
        .map(|raw| parse_user_agents(&raw))
        .filter(|agents| !agents.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect());

    Ok(AppConfig {
        env,
        log_level,
        search_base_url,
        navigation_timeout_secs,
        consent_timeout_secs,
        feed_timeout_secs,
        concurrency,
        scroll_pause_min_ms,
        scroll_pause_max_ms,
        stagnation_limit,
        max_scroll_iterations,
        run_deadline_secs,
        navigation_retries,
        retry_backoff_base_ms,
        user_agents,
        chrome_path: optional_path("MAPSCOUT_CHROME_PATH"),
        debug_dump_dir: optional_path("MAPSCOUT_DEBUG_DUMP_DIR"),
    })
}

/// Split a `|`-separated user-agent list, dropping blank entries.
fn parse_user_agents(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
