pub mod app_config;
pub mod config;
pub mod types;
pub mod update;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use types::{CovidSnapshot, CsvSummary, NewsArticle, SnapshotSource, StoredArticle};
pub use update::{
    seconds_until, RefreshTarget, UpdateDescriptor, UpdateRequest, UpdateTime, REPEAT_INTERVAL,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Validation failures for user-submitted update requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("update name must not be empty")]
    EmptyUpdateName,

    #[error("no update time was given")]
    MissingUpdateTime,

    #[error("invalid update time \"{0}\": expected HH:MM")]
    InvalidUpdateTime(String),

    #[error("select covid data, news, or both to refresh")]
    NothingToRefresh,
}
