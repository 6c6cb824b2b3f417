use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the current covid figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Api,
    Csv,
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Api => write!(f, "covid API"),
            SnapshotSource::Csv => write!(f, "CSV snapshot"),
        }
    }
}

/// The covid figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovidSnapshot {
    pub local_location: String,
    pub national_location: String,
    pub local_week_cases: i64,
    pub national_week_cases: i64,
    pub national_hospital_cases: Option<i64>,
    pub national_cumulative_deaths: Option<i64>,
    pub source: SnapshotSource,
    pub fetched_at: DateTime<Utc>,
}

/// Figures extracted from a local CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvSummary {
    pub area_name: Option<String>,
    pub week_cases: i64,
    pub hospital_cases: i64,
    pub cumulative_deaths: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A news article held in the dashboard store.
///
/// Dismissed articles stay stored so later refreshes do not bring them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub article: NewsArticle,
    pub dismissed: bool,
}

impl StoredArticle {
    #[must_use]
    pub fn new(article: NewsArticle) -> Self {
        Self {
            article,
            dismissed: false,
        }
    }
}
