use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use covidash_core::{AppConfig, CovidSnapshot, CsvSummary, NewsArticle};
use covidash_sources::{content_preview, CovidClient, HttpSettings, NewsClient};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "covidash-cli")]
#[command(about = "Fetch covid figures and news from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Summarise a dashboard CSV export
    Csv {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// Fetch the current local and national covid figures
    Covid,
    /// Fetch news headlines
    News {
        /// Search terms (defaults to `COVIDASH_NEWS_TERMS`)
        #[arg(long)]
        terms: Option<String>,

        /// Maximum number of headlines to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Csv { path } => run_csv(&path)?,
        Commands::Covid => {
            let config = covidash_core::load_app_config()?;
            run_covid(&config).await?;
        }
        Commands::News { terms, limit } => {
            let config = covidash_core::load_app_config()?;
            run_news(&config, terms.as_deref(), limit).await?;
        }
    }

    Ok(())
}

fn run_csv(path: &Path) -> anyhow::Result<()> {
    let summary = covidash_sources::summarize_csv_file(path)?;
    println!("{}", format_csv_summary(&summary));
    Ok(())
}

async fn run_covid(config: &AppConfig) -> anyhow::Result<()> {
    let settings = HttpSettings::from_config(config);
    let client = CovidClient::with_base_url(&config.covid_api_url, &settings)?;
    let today = chrono::Local::now().date_naive();
    let snapshot = client
        .collect_snapshot(&config.location, &config.location_type, &config.nation, today)
        .await?;
    println!("{}", format_snapshot(&snapshot));
    Ok(())
}

async fn run_news(
    config: &AppConfig,
    terms: Option<&str>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let settings = HttpSettings::from_config(config);
    let client = NewsClient::with_base_url(&config.news_api_key, &config.news_api_url, &settings)?;
    let terms = terms.unwrap_or(&config.news_terms);
    let articles = client.fetch_articles(terms).await?;
    let limit = limit.unwrap_or(config.news_display_limit);

    if articles.is_empty() {
        println!("No articles found for \"{terms}\".");
        return Ok(());
    }
    for article in articles.iter().take(limit) {
        println!("{}\n", format_article(article));
    }
    Ok(())
}

fn format_csv_summary(summary: &CsvSummary) -> String {
    let area = summary.area_name.as_deref().unwrap_or("unknown area");
    format!(
        "{area}\n  7-day cases:     {}\n  hospital cases:  {}\n  total deaths:    {}",
        summary.week_cases, summary.hospital_cases, summary.cumulative_deaths
    )
}

fn format_snapshot(snapshot: &CovidSnapshot) -> String {
    let or_unknown = |v: Option<i64>| v.map_or_else(|| "unavailable".to_owned(), |n| n.to_string());
    format!(
        "{local}: {local_cases} cases in the last 7 days\n\
         {national}: {national_cases} cases in the last 7 days\n  \
         hospital cases: {hospital}\n  \
         total deaths:   {deaths}",
        local = snapshot.local_location,
        local_cases = snapshot.local_week_cases,
        national = snapshot.national_location,
        national_cases = snapshot.national_week_cases,
        hospital = or_unknown(snapshot.national_hospital_cases),
        deaths = or_unknown(snapshot.national_cumulative_deaths),
    )
}

fn format_article(article: &NewsArticle) -> String {
    let mut out = article.title.clone();
    if let Some(source) = &article.source_name {
        out.push_str(&format!(" ({source})"));
    }
    if let Some(content) = article.content.as_deref().or(article.description.as_deref()) {
        out.push_str("\n  ");
        out.push_str(&content_preview(content));
    }
    out.push_str("\n  ");
    out.push_str(&article.url);
    out
}
