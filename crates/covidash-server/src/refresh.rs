//! Refreshes the store from the upstream APIs.

use std::path::Path;

use async_trait::async_trait;
use chrono::{Local, Utc};
use covidash_core::{AppConfig, CovidSnapshot, SnapshotSource};
use covidash_sources::{summarize_csv_file, CovidClient, HttpSettings, NewsClient, SourceError};

use crate::scheduler::Refresher;
use crate::store::Store;

/// Fetches covid figures and news articles and writes them to the store.
pub struct SourceRefresher {
    store: Store,
    covid: CovidClient,
    news: NewsClient,
    location: String,
    location_type: String,
    nation: String,
    news_terms: String,
}

impl SourceRefresher {
    #[must_use]
    pub fn new(store: Store, covid: CovidClient, news: NewsClient, config: &AppConfig) -> Self {
        Self {
            store,
            covid,
            news,
            location: config.location.clone(),
            location_type: config.location_type.clone(),
            nation: config.nation.clone(),
            news_terms: config.news_terms.clone(),
        }
    }

    /// Builds both API clients from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if either client cannot be constructed.
    pub fn from_config(store: Store, config: &AppConfig) -> Result<Self, SourceError> {
        let settings = HttpSettings::from_config(config);
        let covid = CovidClient::with_base_url(&config.covid_api_url, &settings)?;
        let news = NewsClient::with_base_url(&config.news_api_key, &config.news_api_url, &settings)?;
        Ok(Self::new(store, covid, news, config))
    }

    /// Loads covid figures from a CSV export into the store.
    ///
    /// The file describes a single area, so it fills both the local and the
    /// national figures.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] or [`SourceError::Csv`] if the file cannot
    /// be read or processed.
    pub async fn seed_from_csv(&self, path: &Path) -> Result<CovidSnapshot, SourceError> {
        let summary = summarize_csv_file(path)?;
        let area = summary.area_name.unwrap_or_else(|| self.nation.clone());

        let snapshot = CovidSnapshot {
            local_location: area.clone(),
            national_location: area,
            local_week_cases: summary.week_cases,
            national_week_cases: summary.week_cases,
            national_hospital_cases: Some(summary.hospital_cases),
            national_cumulative_deaths: Some(summary.cumulative_deaths),
            source: SnapshotSource::Csv,
            fetched_at: Utc::now(),
        };
        self.store.set_covid(snapshot.clone()).await;

        tracing::info!(
            path = %path.display(),
            week_cases = snapshot.local_week_cases,
            "refresh: seeded covid figures from CSV"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl Refresher for SourceRefresher {
    async fn refresh_covid(&self) -> Result<(), SourceError> {
        let today = Local::now().date_naive();
        let snapshot = self
            .covid
            .collect_snapshot(&self.location, &self.location_type, &self.nation, today)
            .await?;

        tracing::info!(
            local = %snapshot.local_location,
            local_week_cases = snapshot.local_week_cases,
            national_week_cases = snapshot.national_week_cases,
            "refresh: covid figures updated"
        );
        self.store.set_covid(snapshot).await;
        Ok(())
    }

    async fn refresh_news(&self) -> Result<(), SourceError> {
        let articles = self.news.fetch_articles(&self.news_terms).await?;
        let received = articles.len();
        let added = self.store.merge_articles(articles).await;
        tracing::info!(received, added, "refresh: news articles merged");
        Ok(())
    }
}
