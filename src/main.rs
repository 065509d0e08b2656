use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use analysis_engine::AnalysisEngine;
use api::AppState;
use reddit_client::{CacheManager, Collector, RateLimiter, RedditClient, RedditProvider};
use storage::DataStore;
use trendscope_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trendscope=info,api=info,reddit_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let provider = Arc::new(RedditProvider::new(&config.reddit)?);
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_requests_per_minute));
    let cache = CacheManager::new(
        &config.cache.dir,
        config.cache.post_expiry_hours,
        config.cache.comment_expiry_minutes,
    )
    .context("failed to initialize cache")?;

    let client = Arc::new(RedditClient::new(provider, rate_limiter, cache));
    let store = Arc::new(
        DataStore::new(&config.storage.data_dir, &config.storage.reports_dir)
            .context("failed to initialize storage")?,
    );

    let state = AppState {
        collector: Arc::new(Collector::new(client.clone())),
        client,
        engine: Arc::new(AnalysisEngine::new()),
        store,
        config: Arc::new(config.clone()),
    };

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "trendscope api listening");

    axum::serve(listener, api::router(state))
        .await
        .context("server error")?;
    Ok(())
}
