use std::net::SocketAddr;
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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub location: String,
    pub location_type: String,
    pub nation: String,
    pub covid_api_url: String,
    pub news_api_key: String,
    pub news_api_url: String,
    pub news_terms: String,
    pub news_display_limit: usize,
    pub csv_path: Option<PathBuf>,
    pub refresh_on_start: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("location", &self.location)
            .field("location_type", &self.location_type)
            .field("nation", &self.nation)
            .field("covid_api_url", &self.covid_api_url)
            .field("news_api_key", &"[redacted]")
            .field("news_api_url", &self.news_api_url)
            .field("news_terms", &self.news_terms)
            .field("news_display_limit", &self.news_display_limit)
            .field("csv_path", &self.csv_path)
            .field("refresh_on_start", &self.refresh_on_start)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .finish()
    }
}
