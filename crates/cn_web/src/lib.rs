use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use cn_core::Result;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/fetch", post(handlers::run_fetch))
        .route("/api/query", post(handlers::run_query))
        .route("/api/articles", get(handlers::list_articles))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the dashboard API until the process is interrupted.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Dashboard API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

pub mod prelude {
    pub use super::{create_app, serve, AppState};
    pub use cn_core::{Error, Result};
}
