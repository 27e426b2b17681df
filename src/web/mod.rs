pub mod render;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::error;

use crate::error::{Error, Result};
use crate::search::SearchIndex;
use crate::{SearchEngine, SearchResult};

pub struct AppState<I: SearchIndex> {
    pub engine: Arc<SearchEngine<I>>,
    pub search_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// `/search` renders the result page, `/api/search` returns JSON, and every
/// other path is a file under the crawl root.
pub fn router<I: SearchIndex>(engine: Arc<SearchEngine<I>>, search_timeout: Duration) -> Router {
    let files = ServeDir::new(engine.root());
    let state = Arc::new(AppState {
        engine,
        search_timeout,
    });

    Router::new()
        .route("/search", get(search_page::<I>))
        .route("/api/search", get(search_json::<I>))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve<I: SearchIndex>(
    engine: Arc<SearchEngine<I>>,
    addr: std::net::SocketAddr,
    search_timeout: Duration,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(engine, search_timeout))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn run_search<I: SearchIndex>(state: &AppState<I>, query: &str) -> Result<Vec<SearchResult>> {
    match timeout(state.search_timeout, state.engine.search(query)).await {
        Ok(results) => results,
        Err(_) => Err(Error::SearchTimeout(state.search_timeout)),
    }
}

async fn search_page<I: SearchIndex>(
    State(state): State<Arc<AppState<I>>>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>> {
    let results = run_search(&state, &params.q).await?;
    Ok(Html(render::search_page(&params.q, &results)))
}

async fn search_json<I: SearchIndex>(
    State(state): State<Arc<AppState<I>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let results = run_search(&state, &params.q).await?;
    Ok(Json(SearchResponse {
        query: params.q,
        results,
    }))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::SearchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
