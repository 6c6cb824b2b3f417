//! Client for the News API `everything` endpoint.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use covidash_core::NewsArticle;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::HttpSettings;

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/";

/// Trailing `[+1234 chars]` marker the API appends to truncated content.
static TRUNCATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\[\+\d+ chars\]\s*$").expect("valid truncation marker regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

impl RawArticle {
    fn into_article(self) -> Option<NewsArticle> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        let published_at = self
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Some(NewsArticle {
            title,
            url,
            description: self.description,
            content: self.content,
            source_name: self.source.and_then(|s| s.name),
            published_at,
        })
    }
}

/// Client for the News API.
///
/// Use [`NewsClient::new`] for production or [`NewsClient::with_base_url`]
/// to point at a mock server in tests.
pub struct NewsClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl NewsClient {
    /// Creates a client pointed at the public News API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, settings)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        settings: &HttpSettings,
    ) -> Result<Self, SourceError> {
        let client = settings.build_client()?;

        // A trailing slash makes `join("everything")` append rather than
        // replace the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.backoff_base_secs,
        })
    }

    /// Searches for articles matching `terms`, most popular first.
    ///
    /// Articles missing a title or url are dropped.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Api`] if the body reports `"status": "error"`.
    /// - [`SourceError::RateLimited`] on HTTP 429 after all retries.
    /// - [`SourceError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`SourceError::Http`] on network failure after all retries.
    /// - [`SourceError::Deserialize`] if the body has an unexpected shape.
    pub async fn fetch_articles(&self, terms: &str) -> Result<Vec<NewsArticle>, SourceError> {
        let url = self.everything_url(terms)?;

        let body = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move { self.request_json(url).await }
        })
        .await?;

        let response: EverythingResponse =
            serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
                context: format!("everything(q={terms})"),
                source: e,
            })?;

        let received = response.articles.len();
        let articles: Vec<NewsArticle> = response
            .articles
            .into_iter()
            .filter_map(RawArticle::into_article)
            .collect();

        tracing::debug!(
            terms,
            received,
            kept = articles.len(),
            "news: fetched articles"
        );

        Ok(articles)
    }

    fn everything_url(&self, terms: &str) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join("everything")
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("q", terms)
            .append_pair("sortBy", "popularity")
            .append_pair("apiKey", &self.api_key);
        Ok(url)
    }

    async fn request_json(&self, url: Url) -> Result<serde_json::Value, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(SourceError::RateLimited {
                service: "newsapi".to_owned(),
                retry_after_secs,
            });
        }

        let body = response.text().await?;
        // The API reports key and parameter problems in the body alongside a
        // 4xx status, so the body is checked before the status.
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            check_api_error(&value)?;
            if status.is_success() {
                return Ok(value);
            }
        }

        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: "everything".to_owned(),
            source: e,
        })
    }
}

fn check_api_error(body: &serde_json::Value) -> Result<(), SourceError> {
    if body.get("status").and_then(serde_json::Value::as_str) == Some("error") {
        let code = body
            .get("code")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::Api(format!("{code}: {message}")));
    }
    Ok(())
}

/// Strips the trailing `[+N chars]` truncation marker from article content.
#[must_use]
pub fn content_preview(content: &str) -> String {
    TRUNCATION_MARKER.replace(content, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> NewsClient {
        NewsClient::with_base_url("test-key", base_url, &HttpSettings::default())
            .expect("client construction should not fail")
    }

    #[test]
    fn everything_url_has_query_sort_and_key() {
        let client = test_client("https://newsapi.org/v2");
        let url = client.everything_url("Covid COVID-19").unwrap();
        assert_eq!(
            url.as_str(),
            "https://newsapi.org/v2/everything?q=Covid+COVID-19&sortBy=popularity&apiKey=test-key"
        );
    }

    #[test]
    fn content_preview_strips_marker() {
        assert_eq!(
            content_preview("Cases rose again this week\u{2026} [+2841 chars]"),
            "Cases rose again this week\u{2026}"
        );
    }

    #[test]
    fn content_preview_leaves_plain_text_alone() {
        assert_eq!(content_preview("No marker here"), "No marker here");
    }

    #[test]
    fn content_preview_only_strips_trailing_marker() {
        assert_eq!(
            content_preview("[+12 chars] at the start"),
            "[+12 chars] at the start"
        );
    }

    #[test]
    fn article_without_url_is_dropped() {
        let raw: RawArticle = serde_json::from_value(serde_json::json!({
            "title": "Headline",
            "url": null
        }))
        .unwrap();
        assert!(raw.into_article().is_none());
    }

    #[test]
    fn article_fields_are_mapped() {
        let raw: RawArticle = serde_json::from_value(serde_json::json!({
            "source": { "id": null, "name": "BBC News" },
            "title": "Booster rollout expands",
            "url": "https://example.com/booster",
            "description": "More people eligible",
            "content": "Text [+100 chars]",
            "publishedAt": "2021-11-19T08:30:00Z"
        }))
        .unwrap();
        let article = raw.into_article().unwrap();
        assert_eq!(article.source_name.as_deref(), Some("BBC News"));
        assert_eq!(article.title, "Booster rollout expands");
        assert_eq!(
            article.published_at.map(|d| d.to_rfc3339()),
            Some("2021-11-19T08:30:00+00:00".to_owned())
        );
    }

    #[test]
    fn unparseable_publish_date_is_ignored() {
        let raw: RawArticle = serde_json::from_value(serde_json::json!({
            "title": "t",
            "url": "https://example.com/t",
            "publishedAt": "yesterday"
        }))
        .unwrap();
        assert_eq!(raw.into_article().unwrap().published_at, None);
    }

    #[test]
    fn error_status_in_body_becomes_api_error() {
        let body = serde_json::json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid."
        });
        match check_api_error(&body) {
            Err(SourceError::Api(msg)) => {
                assert_eq!(msg, "apiKeyInvalid: Your API key is invalid.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
