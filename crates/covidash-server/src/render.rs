//! HTML rendering for the dashboard page.

use covidash_core::{CovidSnapshot, NewsArticle, UpdateDescriptor};
use covidash_sources::content_preview;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

pub const PAGE_TITLE: &str = "COVID-19 Tracker";

/// Everything shown on one render of the dashboard.
#[derive(Debug, Default)]
pub struct DashboardView {
    pub covid: Option<CovidSnapshot>,
    pub articles: Vec<NewsArticle>,
    pub updates: Vec<UpdateDescriptor>,
    pub notice: Option<String>,
}

fn action_link(param: &str, value: &str) -> String {
    format!(
        "/index?{param}={}",
        utf8_percent_encode(value, NON_ALPHANUMERIC)
    )
}

fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn optional_count(value: Option<i64>) -> String {
    value.map_or_else(|| "unavailable".to_owned(), format_count)
}

#[must_use]
pub fn render_dashboard(view: &DashboardView) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (PAGE_TITLE) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { (PAGE_TITLE) }
                    @if let Some(notice) = &view.notice {
                        p.notice role="status" { (notice) }
                    }
                    div.columns {
                        section.updates {
                            h2 { "Scheduled updates" }
                            (render_updates(&view.updates))
                            (render_schedule_form())
                        }
                        section.covid {
                            (render_covid(view.covid.as_ref()))
                        }
                        section.news {
                            h2 { "News" }
                            (render_news(&view.articles))
                        }
                    }
                }
            }
        }
    }
}

fn render_covid(snapshot: Option<&CovidSnapshot>) -> Markup {
    html! {
        @match snapshot {
            Some(s) => {
                h2 { (s.local_location) }
                p { "Local 7-day infection rate: " strong { (format_count(s.local_week_cases)) } }
                h2 { (s.national_location) }
                p { "National 7-day infection rate: " strong { (format_count(s.national_week_cases)) } }
                p { "National current hospital cases: " strong { (optional_count(s.national_hospital_cases)) } }
                p { "National total deaths: " strong { (optional_count(s.national_cumulative_deaths)) } }
                p.source {
                    "Source: " (s.source) ", "
                    time datetime=(s.fetched_at.to_rfc3339()) {
                        (s.fetched_at.format("%Y-%m-%d %H:%M UTC"))
                    }
                }
            }
            None => {
                h2 { "Covid data" }
                p.empty-state { "No covid data yet. Schedule an update to fetch it." }
            }
        }
    }
}

fn render_news(articles: &[NewsArticle]) -> Markup {
    html! {
        @if articles.is_empty() {
            p.empty-state { "No news articles to show." }
        } @else {
            @for article in articles {
                article.news-item {
                    a.dismiss href=(action_link("dismiss", &article.title)) title="Dismiss" { "\u{2715}" }
                    h3 { (article.title) }
                    @if let Some(source) = &article.source_name {
                        p.news-source { (source) }
                    }
                    @if let Some(content) = article.content.as_deref().or(article.description.as_deref()) {
                        p { (content_preview(content)) " " a href=(article.url) { "Read more" } }
                    } @else {
                        p { a href=(article.url) { "Read more" } }
                    }
                }
            }
        }
    }
}

fn render_updates(updates: &[UpdateDescriptor]) -> Markup {
    html! {
        @if updates.is_empty() {
            p.empty-state { "No updates scheduled." }
        } @else {
            ul.update-list {
                @for update in updates {
                    li.update-item {
                        a.dismiss href=(action_link("cancel", &update.name)) title="Cancel update" { "\u{2715}" }
                        strong { (update.name) }
                        p { (update.summary) }
                    }
                }
            }
        }
    }
}

fn render_schedule_form() -> Markup {
    html! {
        form.schedule action="/index" method="get" {
            label for="update_name" { "Update label" }
            input #update_name type="text" name="update_name" required;
            label for="update_time" { "Time" }
            input #update_time type="time" name="update_time" required;
            label { input type="checkbox" name="repeat" value="repeat"; " Repeat daily" }
            label { input type="checkbox" name="covid_data" value="covid-data"; " Update covid data" }
            label { input type="checkbox" name="news" value="news"; " Update news articles" }
            button type="submit" { "Schedule update" }
        }
    }
}

const CSS: &str = r"
body { font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 0; background: #f4f5f7; color: #1d1f23; }
.container { max-width: 1200px; margin: 0 auto; padding: 24px; }
.columns { display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 24px; }
section { background: #fff; border-radius: 8px; padding: 16px; }
.notice { background: #fff4d6; border: 1px solid #e8c766; padding: 8px 12px; border-radius: 6px; }
.news-item, .update-item { position: relative; border-bottom: 1px solid #e3e5e8; padding: 8px 24px 8px 0; }
.update-list { list-style: none; padding: 0; }
.dismiss { position: absolute; right: 0; top: 8px; text-decoration: none; color: #8a8f98; }
.news-source, .source, .empty-state { color: #6b7079; font-size: 0.9em; }
form.schedule { display: flex; flex-direction: column; gap: 6px; margin-top: 16px; }
";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use covidash_core::{RefreshTarget, SnapshotSource, UpdateRequest, UpdateTime};

    fn snapshot() -> CovidSnapshot {
        CovidSnapshot {
            local_location: "Exeter".to_owned(),
            national_location: "England".to_owned(),
            local_week_cases: 1_234,
            national_week_cases: 240_299,
            national_hospital_cases: Some(7_019),
            national_cumulative_deaths: None,
            source: SnapshotSource::Api,
            fetched_at: Utc.with_ymd_and_hms(2021, 11, 20, 9, 30, 0).unwrap(),
        }
    }

    fn article(title: &str, content: Option<&str>) -> NewsArticle {
        NewsArticle {
            title: title.to_owned(),
            url: "https://example.com/story".to_owned(),
            description: Some("A description".to_owned()),
            content: content.map(str::to_owned),
            source_name: Some("Example News".to_owned()),
            published_at: None,
        }
    }

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(240_299), "240,299");
        assert_eq!(format_count(-1_234_567), "-1,234,567");
    }

    #[test]
    fn action_link_encodes_value() {
        assert_eq!(
            action_link("dismiss", "Covid & you?"),
            "/index?dismiss=Covid%20%26%20you%3F"
        );
    }

    #[test]
    fn renders_covid_figures() {
        let html = render_dashboard(&DashboardView {
            covid: Some(snapshot()),
            ..DashboardView::default()
        })
        .into_string();
        assert!(html.contains("Exeter"));
        assert!(html.contains("1,234"));
        assert!(html.contains("240,299"));
        assert!(html.contains("7,019"));
        assert!(html.contains("unavailable"));
        assert!(html.contains("covid API"));
    }

    #[test]
    fn renders_empty_state_without_covid_data() {
        let html = render_dashboard(&DashboardView::default()).into_string();
        assert!(html.contains("No covid data yet"));
        assert!(html.contains("No news articles to show."));
        assert!(html.contains("No updates scheduled."));
    }

    #[test]
    fn news_item_has_preview_read_more_and_dismiss_link() {
        let html = render_dashboard(&DashboardView {
            articles: vec![article("Booster news", Some("Full story here [+512 chars]"))],
            ..DashboardView::default()
        })
        .into_string();
        assert!(html.contains("Full story here"));
        assert!(!html.contains("[+512 chars]"));
        assert!(html.contains("Read more"));
        assert!(html.contains(r#"href="/index?dismiss=Booster%20news""#));
    }

    #[test]
    fn news_falls_back_to_description() {
        let html = render_dashboard(&DashboardView {
            articles: vec![article("Headline", None)],
            ..DashboardView::default()
        })
        .into_string();
        assert!(html.contains("A description"));
    }

    #[test]
    fn update_list_has_summary_and_cancel_link() {
        let request = UpdateRequest {
            name: "morning".to_owned(),
            time: UpdateTime::parse("08:15").unwrap(),
            target: RefreshTarget::Both,
            repeat: true,
        };
        let html = render_dashboard(&DashboardView {
            updates: vec![UpdateDescriptor::from_request(&request, Utc::now())],
            ..DashboardView::default()
        })
        .into_string();
        assert!(html.contains("morning"));
        assert!(html.contains("Updates covid stats and news articles at 08:15."));
        assert!(html.contains(r#"href="/index?cancel=morning""#));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_dashboard(&DashboardView {
            articles: vec![article("<script>alert(1)</script>", None)],
            notice: Some("<b>bold</b>".to_owned()),
            ..DashboardView::default()
        })
        .into_string();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }
}
