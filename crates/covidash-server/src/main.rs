use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use covidash_server::{
    api::{build_app, AppState},
    refresh::SourceRefresher,
    scheduler::{Refresher, UpdateScheduler},
    store::Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = covidash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting covidash");

    let store = Store::new();
    let refresher = Arc::new(SourceRefresher::from_config(store.clone(), &config)?);

    if let Some(path) = &config.csv_path {
        if let Err(e) = refresher.seed_from_csv(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to seed covid figures from CSV");
        }
    }

    if config.refresh_on_start {
        let initial = Arc::clone(&refresher);
        tokio::spawn(async move {
            if let Err(e) = initial.refresh_covid().await {
                tracing::warn!(error = %e, "initial covid refresh failed");
            }
            if let Err(e) = initial.refresh_news().await {
                tracing::warn!(error = %e, "initial news refresh failed");
            }
        });
    }

    let scheduler = UpdateScheduler::start(store.clone(), refresher).await?;
    let app = build_app(AppState {
        store,
        scheduler: scheduler.clone(),
        display_limit: config.news_display_limit,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
