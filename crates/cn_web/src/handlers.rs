use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

pub const DEFAULT_ARTICLE_LIMIT: usize = 20;
const MAX_ARTICLE_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ArticlesParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.storage.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Runs one pipeline cycle inline and reports what it did.
pub async fn run_fetch(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.run_cycle().await)
}

pub async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let answer = state.query_engine.answer(&request.question).await;
    Json(QueryResponse { answer })
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ArticlesParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ARTICLE_LIMIT)
        .clamp(1, MAX_ARTICLE_LIMIT);

    match state.storage.recent_articles(limit).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
