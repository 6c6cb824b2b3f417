pub mod covid;
pub mod csv;
pub mod error;
pub mod news;
mod retry;

pub use covid::{AreaSeries, CovidClient, CovidRecord};
pub use csv::{parse_csv_data, process_covid_csv_data, summarize_csv_file};
pub use error::SourceError;
pub use news::{content_preview, NewsClient};

use std::time::Duration;

use reqwest::Client;

/// Shared HTTP client settings for every upstream API.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Extra attempts after the first failure on transient errors.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl HttpSettings {
    #[must_use]
    pub fn from_config(config: &covidash_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "covidash/0.1 (personal-dashboard)".to_string(),
            max_retries: 3,
            backoff_base_secs: 2,
        }
    }
}
