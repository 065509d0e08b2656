use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use trendscope_core::{
    AnalysisResult, CollectionRequest, CollectionResponse, CoreError,
};

use crate::error::ApiError;
use crate::AppState;

pub(crate) async fn index() -> Json<Value> {
    Json(json!({
        "service": "trendscope",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/collect",
            "/analyze",
            "/data/files",
            "/data/{filename}",
            "/analysis/latest",
            "/subreddits",
        ],
    }))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "rate_limit_remaining": state.client.rate_limiter().remaining_requests().await,
        "timestamp": Utc::now(),
    }))
}

/// Run a collection pass. An empty body uses the configured defaults across
/// all configured subreddits; a JSON body narrows the run.
pub(crate) async fn collect(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CollectionResponse>, ApiError> {
    let request: CollectionRequest = if body.is_empty() {
        CollectionRequest {
            subreddits: None,
            posts_per_subreddit: state.config.collection.posts_per_subreddit,
            time_period_days: state.config.collection.time_period_days,
            include_comments: true,
            top_comments_limit: state.config.collection.top_comments_limit,
        }
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError(CoreError::InvalidInput {
                message: format!("invalid request body: {e}"),
            })
        })?
    };

    let subreddits = request
        .subreddits
        .unwrap_or_else(|| state.config.subreddits.all());
    if subreddits.is_empty() {
        return Err(ApiError(CoreError::InvalidInput {
            message: "no subreddits to collect".to_string(),
        }));
    }

    let dataset = state
        .collector
        .collect_all(
            &subreddits,
            request.posts_per_subreddit,
            request.time_period_days,
            request.include_comments,
            request.top_comments_limit,
        )
        .await;
    let data_file = state.store.save_dataset(&dataset)?;

    // Analysis piggybacks on every collection; losing the report is not
    // worth failing the collection over.
    let analysis = state.engine.analyze(&dataset);
    if let Err(e) = state.store.save_analysis(&analysis) {
        warn!(error = %e, "failed to save analysis report");
    }

    let client = state.client.clone();
    if let Ok(removed) = tokio::task::spawn_blocking(move || client.sweep_cache()).await {
        debug!(removed, "swept expired cache entries");
    }

    let collected = dataset.subreddits.len();
    Ok(Json(CollectionResponse {
        success: collected > 0,
        message: format!(
            "collected {collected} of {} subreddits",
            subreddits.len()
        ),
        subreddits_collected: collected,
        total_posts: dataset.posts.len(),
        total_comments: dataset.comments.len(),
        data_file,
        collected_at: dataset.collected_at,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeParams {
    pub data_file: Option<String>,
}

/// Analyze a stored dataset. Without `data_file` the most recent dataset is
/// used.
pub(crate) async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let data_file = match params.data_file {
        Some(name) => name,
        None => state
            .store
            .list_datasets()?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound {
                resource: "collected dataset".to_string(),
            })?,
    };

    let dataset = state.store.load_dataset(&data_file)?;
    let analysis = state.engine.analyze(&dataset);
    state.store.save_analysis(&analysis)?;
    Ok(Json(analysis))
}

pub(crate) async fn list_files(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({
        "datasets": state.store.list_datasets()?,
        "analyses": state.store.list_analyses()?,
    })))
}

pub(crate) async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.load_raw(&filename)?))
}

pub(crate) async fn latest_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalysisResult>, ApiError> {
    Ok(Json(state.store.latest_analysis()?))
}

pub(crate) async fn subreddits(State(state): State<AppState>) -> Json<Value> {
    let groups = &state.config.subreddits;
    Json(json!({
        "ai_ml": groups.ai_ml,
        "running": groups.running,
        "nutrition": groups.nutrition,
        "strength_training": groups.strength_training,
        "all": groups.all(),
    }))
}
