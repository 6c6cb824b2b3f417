use crate::app_config::{AppConfig, Environment};
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
/// Parsing is decoupled from the real environment so tests can drive it with a
/// plain `HashMap`.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("COVIDASH_ENV", "development"))?;
    let bind_addr: SocketAddr = parse_as(
        "COVIDASH_BIND_ADDR",
        &or_default("COVIDASH_BIND_ADDR", "127.0.0.1:5000"),
    )?;
    let log_level = or_default("COVIDASH_LOG_LEVEL", "info");

    let location = or_default("COVIDASH_LOCATION", "Exeter");
    let location_type = or_default("COVIDASH_LOCATION_TYPE", "ltla");
    let nation = or_default("COVIDASH_NATION", "England");
    let covid_api_url = or_default(
        "COVIDASH_COVID_API_URL",
        "https://api.coronavirus.data.gov.uk/v1/data",
    );

    let news_api_key = require("NEWS_API_KEY")?;
    let news_api_url = or_default("COVIDASH_NEWS_API_URL", "https://newsapi.org/v2/");
    let news_terms = or_default("COVIDASH_NEWS_TERMS", "Covid COVID-19 coronavirus");
    let news_display_limit: usize = parse_as(
        "COVIDASH_NEWS_DISPLAY_LIMIT",
        &or_default("COVIDASH_NEWS_DISPLAY_LIMIT", "4"),
    )?;

    let csv_path = lookup("COVIDASH_CSV_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let refresh_on_start = parse_bool(
        "COVIDASH_REFRESH_ON_START",
        &or_default("COVIDASH_REFRESH_ON_START", "true"),
    )?;

    let request_timeout_secs: u64 = parse_as(
        "COVIDASH_REQUEST_TIMEOUT_SECS",
        &or_default("COVIDASH_REQUEST_TIMEOUT_SECS", "30"),
    )?;
    let user_agent = or_default("COVIDASH_USER_AGENT", "covidash/0.1 (personal-dashboard)");
    let max_retries: u32 = parse_as(
        "COVIDASH_MAX_RETRIES",
        &or_default("COVIDASH_MAX_RETRIES", "3"),
    )?;
    let retry_backoff_base_secs: u64 = parse_as(
        "COVIDASH_RETRY_BACKOFF_BASE_SECS",
        &or_default("COVIDASH_RETRY_BACKOFF_BASE_SECS", "2"),
    )?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        location,
        location_type,
        nation,
        covid_api_url,
        news_api_key,
        news_api_url,
        news_terms,
        news_display_limit,
        csv_path,
        refresh_on_start,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COVIDASH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
