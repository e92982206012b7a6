//! HTTP server for the search API and browser page

use super::handler::{
    document_handler, search_handler, similar_handler, status_handler, summarize_handler,
    summary_handler,
};
use crate::session::Services;
use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use rust_embed::RustEmbed;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(RustEmbed)]
#[folder = "src/http/static/"]
struct Assets;

async fn static_handler() -> impl IntoResponse {
    match Assets::get("index.html") {
        Some(file) => Html(String::from_utf8_lossy(file.data.as_ref()).into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "index.html not bundled").into_response(),
    }
}

async fn logo_handler() -> impl IntoResponse {
    match Assets::get("logo.svg") {
        Some(file) => (
            [(header::CONTENT_TYPE, mime::IMAGE_SVG.as_ref())],
            file.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Routes for the API and the embedded page
pub fn router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/", get(static_handler))
        .route("/logo.svg", get(logo_handler))
        .route("/api/status", get(status_handler))
        .route("/api/search", get(search_handler))
        .route("/api/documents", get(document_handler))
        .route(
            "/api/documents/summary",
            get(summary_handler).post(summarize_handler),
        )
        .route("/api/similar", post(similar_handler))
        .layer(CorsLayer::permissive())
        .with_state(services)
}

pub struct HttpServer {
    services: Arc<Services>,
    bind: String,
    port: u16,
}

impl HttpServer {
    pub fn new(services: Arc<Services>, bind: impl Into<String>, port: u16) -> Self {
        Self {
            services,
            bind: bind.into(),
            port,
        }
    }

    pub async fn start(&self) -> std::io::Result<()> {
        let app = router(Arc::clone(&self.services));

        let addr = format!("{}:{}", self.bind, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Document search available at http://localhost:{}", self.port);

        axum::serve(listener, app).await
    }
}
