//! HTTP surface for the collection and analysis services. Routes are thin:
//! they parse parameters, call into the pipeline and translate domain errors
//! into statuses.

pub mod error;
mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use analysis_engine::AnalysisEngine;
use reddit_client::{Collector, RedditClient};
use storage::DataStore;
use trendscope_core::AppConfig;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<RedditClient>,
    pub collector: Arc<Collector>,
    pub engine: Arc<AnalysisEngine>,
    pub store: Arc<DataStore>,
    pub config: Arc<AppConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/collect", post(routes::collect))
        .route("/analyze", post(routes::analyze))
        .route("/data/files", get(routes::list_files))
        .route("/data/{filename}", get(routes::get_file))
        .route("/analysis/latest", get(routes::latest_analysis))
        .route("/subreddits", get(routes::subreddits))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
