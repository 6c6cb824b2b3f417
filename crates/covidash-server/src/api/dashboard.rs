use axum::{
    extract::{Query, State},
    response::Html,
};
use chrono::Local;
use covidash_core::{UpdateDescriptor, UpdateRequest};

use super::AppState;
use crate::render::{render_dashboard, DashboardView};
use crate::scheduler::ScheduleError;

/// Query parameters accepted by `GET /index`.
///
/// Each field also answers to its legacy form field name. The first value
/// seen for a field wins, whichever name carried it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexQuery {
    pub dismiss: Option<String>,
    pub cancel: Option<String>,
    pub update_name: Option<String>,
    pub update_time: Option<String>,
    pub repeat: Option<String>,
    pub covid_data: Option<String>,
    pub news: Option<String>,
}

impl IndexQuery {
    /// Builds the query from raw key/value pairs in request order. Unknown
    /// keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "dismiss" | "notif" => &mut query.dismiss,
                "cancel" | "update_item" => &mut query.cancel,
                "update_name" | "two" => &mut query.update_name,
                "update_time" | "update" => &mut query.update_time,
                "repeat" => &mut query.repeat,
                "covid_data" | "covid-data" => &mut query.covid_data,
                "news" => &mut query.news,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    fn wants_schedule(&self) -> bool {
        self.update_name.is_some() || self.update_time.is_some()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

pub async fn home(State(state): State<AppState>) -> Html<String> {
    render(&state, None).await
}

/// Applies the dismiss, cancel and schedule actions in that order, then
/// renders the dashboard.
pub async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Html<String> {
    let query = IndexQuery::from_pairs(pairs);
    let mut notices: Vec<String> = Vec::new();

    if let Some(title) = non_empty(query.dismiss.as_ref()) {
        let dismissed = state.store.dismiss_article(title).await;
        tracing::info!(title, dismissed, "dashboard: news article dismissed");
    }

    if let Some(name) = non_empty(query.cancel.as_ref()) {
        match state.scheduler.cancel(name).await {
            Ok(_) => notices.push(format!("Cancelled update \"{name}\".")),
            Err(e) => {
                tracing::warn!(name, error = %e, "dashboard: cancel failed");
                notices.push(format!("Could not cancel: {e}."));
            }
        }
    }

    if query.wants_schedule() {
        match schedule(&state, &query).await {
            Ok(descriptor) => notices.push(format!(
                "Scheduled \"{}\". {}",
                descriptor.name, descriptor.summary
            )),
            Err(e) => {
                tracing::info!(error = %e, "dashboard: update not scheduled");
                notices.push(format!("Nothing was scheduled: {e}."));
            }
        }
    }

    let notice = (!notices.is_empty()).then(|| notices.join(" "));
    render(&state, notice).await
}

async fn schedule(state: &AppState, query: &IndexQuery) -> Result<UpdateDescriptor, ScheduleError> {
    let request = UpdateRequest::validate(
        query.update_name.as_deref(),
        query.update_time.as_deref(),
        query.covid_data.is_some(),
        query.news.is_some(),
        query.repeat.is_some(),
    )?;
    state
        .scheduler
        .schedule(request, Local::now().time())
        .await
}

async fn render(state: &AppState, notice: Option<String>) -> Html<String> {
    let view = DashboardView {
        covid: state.store.covid().await,
        articles: state.store.visible_articles(state.display_limit).await,
        updates: state.store.updates().await,
        notice,
    };
    Html(render_dashboard(&view).into_string())
}
