//! Client for the UK coronavirus dashboard API.
//!
//! Each request asks for a single area and a fixed set of metrics. The API
//! returns one row per day, newest first; the extraction helpers below turn
//! that series into the figures the dashboard shows.

use chrono::{Days, NaiveDate, Utc};
use covidash_core::{CovidSnapshot, SnapshotSource};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::HttpSettings;

const DEFAULT_BASE_URL: &str = "https://api.coronavirus.data.gov.uk/v1/data";

/// Metrics requested for every area, as the API's `structure` parameter.
const STRUCTURE: &str = concat!(
    r#"{"areaCode":"areaCode","areaName":"areaName","areaType":"areaType","date":"date","#,
    r#""cumDeaths28DaysByDeathDate":"cumDeaths28DaysByDeathDate","#,
    r#""hospitalCases":"hospitalCases","newCasesByPublishDate":"newCasesByPublishDate"}"#
);

/// One day of figures for an area.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CovidRecord {
    #[serde(default)]
    pub area_code: Option<String>,
    pub area_name: String,
    #[serde(default)]
    pub area_type: Option<String>,
    pub date: NaiveDate,
    #[serde(rename = "cumDeaths28DaysByDeathDate", default)]
    pub cum_deaths_28_days: Option<i64>,
    #[serde(default)]
    pub hospital_cases: Option<i64>,
    #[serde(default)]
    pub new_cases_by_publish_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CovidApiResponse {
    #[serde(default)]
    data: Vec<CovidRecord>,
    #[serde(default)]
    last_update: Option<String>,
}

/// The daily series returned for one area, newest row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSeries {
    pub records: Vec<CovidRecord>,
    pub last_update: Option<String>,
}

fn days_before(day: NaiveDate, n: u64) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(n))
}

impl AreaSeries {
    /// Name of the area the series belongs to.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.records.first().map(|r| r.area_name.as_str())
    }

    /// New cases over the last seven complete days.
    ///
    /// When the newest row is dated `today` it is still incomplete, so rows
    /// 1..=7 are summed against `today - i`; otherwise rows 0..7 are summed
    /// against `yesterday - i`. Rows whose date does not line up are skipped
    /// and missing values count as zero.
    #[must_use]
    pub fn week_cases(&self, today: NaiveDate) -> i64 {
        let Some(first) = self.records.first() else {
            return 0;
        };

        // (first row index, days between `today` and that row)
        let (start, lag) = if first.date == today { (1, 0) } else { (0, 1) };

        (start..start + 7)
            .filter_map(|i| {
                let record = self.records.get(i)?;
                let expected = days_before(today, u64::try_from(i).ok()? + lag)?;
                (record.date == expected).then(|| record.new_cases_by_publish_date.unwrap_or(0))
            })
            .fold(0, i64::saturating_add)
    }

    /// Current hospital cases: row 2 when it is dated two days ago, else row 3.
    #[must_use]
    pub fn hospital_cases(&self, today: NaiveDate) -> Option<i64> {
        let index = self.aligned_index(today, 2);
        self.records.get(index)?.hospital_cases
    }

    /// Cumulative deaths within 28 days of a positive test, read two weeks
    /// back where the figure has settled: row 14 when it is dated fourteen
    /// days ago, else row 15.
    #[must_use]
    pub fn cumulative_deaths(&self, today: NaiveDate) -> Option<i64> {
        let index = self.aligned_index(today, 14);
        self.records.get(index)?.cum_deaths_28_days
    }

    fn aligned_index(&self, today: NaiveDate, days: usize) -> usize {
        let expected = u64::try_from(days)
            .ok()
            .and_then(|d| days_before(today, d));
        let aligned = self
            .records
            .get(days)
            .is_some_and(|r| Some(r.date) == expected);
        if aligned {
            days
        } else {
            days + 1
        }
    }
}

/// HTTP client for the coronavirus dashboard data endpoint.
pub struct CovidClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl CovidClient {
    /// Creates a client pointed at the public API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, settings)
    }

    /// Creates a client with a custom endpoint (a wiremock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(base_url: &str, settings: &HttpSettings) -> Result<Self, SourceError> {
        let client = settings.build_client()?;
        let base_url = Url::parse(base_url).map_err(|e| SourceError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.backoff_base_secs,
        })
    }

    /// Fetches the daily series for one area.
    ///
    /// # Errors
    ///
    /// - [`SourceError::NoData`] when the API has nothing for the area
    ///   (HTTP 204 or an empty `data` array).
    /// - [`SourceError::RateLimited`] on HTTP 429 after all retries.
    /// - [`SourceError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`SourceError::Http`] on network failure after all retries.
    /// - [`SourceError::Deserialize`] when the body has an unexpected shape.
    pub async fn fetch_area(
        &self,
        area_name: &str,
        area_type: &str,
    ) -> Result<AreaSeries, SourceError> {
        let url = self.area_url(area_name, area_type);

        let response = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();

                if status == StatusCode::NO_CONTENT {
                    return Err(SourceError::NoData {
                        area: area_name.to_owned(),
                    });
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(SourceError::RateLimited {
                        service: url.host_str().unwrap_or("covid API").to_owned(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(SourceError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<CovidApiResponse>(&body).map_err(|e| {
                    SourceError::Deserialize {
                        context: format!("covid data for {area_name} ({area_type})"),
                        source: e,
                    }
                })
            }
        })
        .await?;

        if response.data.is_empty() {
            return Err(SourceError::NoData {
                area: area_name.to_owned(),
            });
        }

        tracing::debug!(
            area = area_name,
            rows = response.data.len(),
            "covid: fetched area series"
        );

        Ok(AreaSeries {
            records: response.data,
            last_update: response.last_update,
        })
    }

    /// Fetches the local and national series and combines them into the
    /// figures shown on the dashboard.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`CovidClient::fetch_area`].
    pub async fn collect_snapshot(
        &self,
        location: &str,
        location_type: &str,
        nation: &str,
        today: NaiveDate,
    ) -> Result<CovidSnapshot, SourceError> {
        let (local, national) = tokio::try_join!(
            self.fetch_area(location, location_type),
            self.fetch_area(nation, "nation"),
        )?;

        Ok(CovidSnapshot {
            local_location: local.location().unwrap_or(location).to_owned(),
            national_location: national.location().unwrap_or(nation).to_owned(),
            local_week_cases: local.week_cases(today),
            national_week_cases: national.week_cases(today),
            national_hospital_cases: national.hospital_cases(today),
            national_cumulative_deaths: national.cumulative_deaths(today),
            source: SnapshotSource::Api,
            fetched_at: Utc::now(),
        })
    }

    fn area_url(&self, area_name: &str, area_type: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(
                "filters",
                &format!("areaType={area_type};areaName={area_name}"),
            )
            .append_pair("structure", STRUCTURE);
        url
    }
}

#[cfg(test)]
#[path = "covid_test.rs"]
mod tests;
