//! User-declared update requests and the descriptors the dashboard lists.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Interval between runs of a repeating update.
pub const REPEAT_INTERVAL: Duration = Duration::from_secs(86_400);

const SECONDS_PER_DAY: i64 = 86_400;

/// Which data sets an update refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTarget {
    Covid,
    News,
    Both,
}

impl RefreshTarget {
    /// Build a target from the two form checkboxes. `None` when neither is set.
    #[must_use]
    pub fn from_flags(covid: bool, news: bool) -> Option<Self> {
        match (covid, news) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Covid),
            (false, true) => Some(Self::News),
            (false, false) => None,
        }
    }

    #[must_use]
    pub fn includes_covid(self) -> bool {
        matches!(self, Self::Covid | Self::Both)
    }

    #[must_use]
    pub fn includes_news(self) -> bool {
        matches!(self, Self::News | Self::Both)
    }

    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Covid => "covid stats",
            Self::News => "news articles",
            Self::Both => "covid stats and news articles",
        }
    }
}

/// A wall-clock time of day at which an update fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UpdateTime(NaiveTime);

impl UpdateTime {
    /// Parse `HH:MM` (as sent by an HTML time input) or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUpdateTime`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .ok()
            .and_then(|t| NaiveTime::from_hms_opt(t.hour(), t.minute(), 0))
            .map(Self)
            .ok_or_else(|| CoreError::InvalidUpdateTime(trimmed.to_string()))
    }

    #[must_use]
    pub fn time(self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for UpdateTime {
    fn from(t: NaiveTime) -> Self {
        Self(t)
    }
}

impl std::fmt::Display for UpdateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for UpdateTime {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UpdateTime> for String {
    fn from(t: UpdateTime) -> Self {
        t.to_string()
    }
}

/// A validated request to refresh data at a wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub name: String,
    pub time: UpdateTime,
    pub target: RefreshTarget,
    pub repeat: bool,
}

impl UpdateRequest {
    /// Validate raw form input into a request.
    ///
    /// Checks run in order: name, time, then refresh target.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyUpdateName`] when the name is missing or blank.
    /// - [`CoreError::MissingUpdateTime`] when no time was given.
    /// - [`CoreError::InvalidUpdateTime`] when the time does not parse.
    /// - [`CoreError::NothingToRefresh`] when neither covid nor news is selected.
    pub fn validate(
        name: Option<&str>,
        time: Option<&str>,
        covid: bool,
        news: bool,
        repeat: bool,
    ) -> Result<Self, CoreError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(CoreError::EmptyUpdateName)?;
        let time = time
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CoreError::MissingUpdateTime)?;
        let time = UpdateTime::parse(time)?;
        let target = RefreshTarget::from_flags(covid, news).ok_or(CoreError::NothingToRefresh)?;

        Ok(Self {
            name: name.to_string(),
            time,
            target,
            repeat,
        })
    }
}

/// Ledger entry for a scheduled update, as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    pub name: String,
    pub time: UpdateTime,
    pub target: RefreshTarget,
    pub repeat: bool,
    pub summary: String,
    pub scheduled_at: DateTime<Utc>,
}

impl UpdateDescriptor {
    #[must_use]
    pub fn from_request(request: &UpdateRequest, scheduled_at: DateTime<Utc>) -> Self {
        let mut summary = format!("Updates {} at {}.", request.target.phrase(), request.time);
        if request.repeat {
            summary.push_str(" It does this every 24 hours.");
        }
        Self {
            name: request.name.clone(),
            time: request.time,
            target: request.target,
            repeat: request.repeat,
            summary,
            scheduled_at,
        }
    }
}

/// Seconds from `now` until the next occurrence of `target`.
///
/// Fractions of a second in `now` are ignored. A target earlier in the day
/// than `now` wraps to tomorrow; an identical time yields `0`.
#[must_use]
pub fn seconds_until(now: NaiveTime, target: NaiveTime) -> u64 {
    let from = i64::from(now.num_seconds_from_midnight());
    let to = i64::from(target.num_seconds_from_midnight());

    if from == to {
        tracing::warn!(time = %target.format("%H:%M:%S"), "update time is now");
        return 0;
    }

    let mut diff = to - from;
    if diff < 0 {
        diff += SECONDS_PER_DAY;
    }
    u64::try_from(diff).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).expect("valid time")
    }

    #[test]
    fn seconds_until_later_today() {
        assert_eq!(seconds_until(hms(10, 0, 0), hms(10, 30, 0)), 1_800);
    }

    #[test]
    fn seconds_until_wraps_past_midnight() {
        assert_eq!(seconds_until(hms(23, 0, 0), hms(1, 0, 0)), 7_200);
    }

    #[test]
    fn seconds_until_same_time_is_zero() {
        assert_eq!(seconds_until(hms(8, 15, 0), hms(8, 15, 0)), 0);
    }

    #[test]
    fn seconds_until_counts_remaining_seconds_in_minute() {
        assert_eq!(seconds_until(hms(12, 0, 45), hms(12, 1, 0)), 15);
    }

    #[test]
    fn seconds_until_one_second_ago_is_almost_a_day() {
        assert_eq!(seconds_until(hms(12, 0, 1), hms(12, 0, 0)), 86_399);
    }

    #[test]
    fn seconds_until_ignores_fractional_seconds() {
        let now = NaiveTime::from_hms_milli_opt(9, 59, 59, 900).unwrap();
        assert_eq!(seconds_until(now, hms(10, 0, 0)), 1);
    }

    #[test]
    fn update_time_parses_html_time_input() {
        let t = UpdateTime::parse("07:05").unwrap();
        assert_eq!(t.time(), hms(7, 5, 0));
        assert_eq!(t.to_string(), "07:05");
    }

    #[test]
    fn update_time_accepts_seconds_but_drops_them() {
        let t = UpdateTime::parse("07:05:30").unwrap();
        assert_eq!(t.to_string(), "07:05");
        assert_eq!(t.time(), hms(7, 5, 0));
    }

    #[test]
    fn update_time_rejects_garbage() {
        assert_eq!(
            UpdateTime::parse("25:00"),
            Err(CoreError::InvalidUpdateTime("25:00".to_string()))
        );
        assert!(UpdateTime::parse("noon").is_err());
    }

    #[test]
    fn update_time_serializes_as_string() {
        let t = UpdateTime::parse("18:45").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"18:45\"");
        let back: UpdateTime = serde_json::from_str("\"18:45\"").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn refresh_target_from_flags() {
        assert_eq!(RefreshTarget::from_flags(true, true), Some(RefreshTarget::Both));
        assert_eq!(RefreshTarget::from_flags(true, false), Some(RefreshTarget::Covid));
        assert_eq!(RefreshTarget::from_flags(false, true), Some(RefreshTarget::News));
        assert_eq!(RefreshTarget::from_flags(false, false), None);
    }

    #[test]
    fn refresh_target_inclusion() {
        assert!(RefreshTarget::Both.includes_covid());
        assert!(RefreshTarget::Both.includes_news());
        assert!(!RefreshTarget::Covid.includes_news());
        assert!(!RefreshTarget::News.includes_covid());
    }

    #[test]
    fn validate_builds_request() {
        let req = UpdateRequest::validate(Some(" morning "), Some("08:00"), true, false, true)
            .expect("valid request");
        assert_eq!(req.name, "morning");
        assert_eq!(req.time.to_string(), "08:00");
        assert_eq!(req.target, RefreshTarget::Covid);
        assert!(req.repeat);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = UpdateRequest::validate(Some("  "), Some("08:00"), true, true, false).unwrap_err();
        assert_eq!(err, CoreError::EmptyUpdateName);
    }

    #[test]
    fn validate_rejects_missing_time() {
        let err = UpdateRequest::validate(Some("a"), None, true, true, false).unwrap_err();
        assert_eq!(err, CoreError::MissingUpdateTime);
        let err = UpdateRequest::validate(Some("a"), Some(""), true, true, false).unwrap_err();
        assert_eq!(err, CoreError::MissingUpdateTime);
    }

    #[test]
    fn validate_rejects_no_target() {
        let err = UpdateRequest::validate(Some("a"), Some("08:00"), false, false, true).unwrap_err();
        assert_eq!(err, CoreError::NothingToRefresh);
    }

    #[test]
    fn descriptor_summary_for_one_off_update() {
        let req = UpdateRequest::validate(Some("lunch"), Some("12:30"), false, true, false).unwrap();
        let d = UpdateDescriptor::from_request(&req, Utc::now());
        assert_eq!(d.summary, "Updates news articles at 12:30.");
    }

    #[test]
    fn descriptor_summary_for_repeating_update() {
        let req = UpdateRequest::validate(Some("daily"), Some("06:00"), true, true, true).unwrap();
        let d = UpdateDescriptor::from_request(&req, Utc::now());
        assert_eq!(
            d.summary,
            "Updates covid stats and news articles at 06:00. It does this every 24 hours."
        );
        assert_eq!(d.name, "daily");
        assert!(d.repeat);
    }

    #[test]
    fn repeat_interval_is_one_day() {
        assert_eq!(REPEAT_INTERVAL.as_secs(), 86_400);
    }
}
