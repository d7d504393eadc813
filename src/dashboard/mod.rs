//! Dashboard: Axum web server over the local ledger.
//!
//! Serves a JSON API, CSV backup download and upload, and a minimal HTML
//! page. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{AppState, DashboardState};

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html lang="ja">
<head><meta charset="utf-8"><title>UmaLog Dashboard</title></head>
<body>
<h1>UmaLog</h1>
<p id="insight"></p>
<pre id="summary"></pre>
<p><a href="/api/export">バックアップをダウンロード</a></p>
<script>
fetch('/api/insight').then(r => r.json()).then(j => {
  document.getElementById('insight').textContent = j.message;
});
fetch('/api/summary').then(r => r.json()).then(j => {
  document.getElementById('summary').textContent = JSON.stringify(j.text, null, 2);
});
</script>
</body>
</html>
"#;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/records", get(routes::get_records))
        .route("/api/summary", get(routes::get_summary))
        .route("/api/insight", get(routes::get_insight))
        .route("/api/pattern", get(routes::get_pattern))
        .route("/api/export", get(routes::get_export))
        .route("/api/import", post(routes::post_import))
        .route("/health", get(routes::health))
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// Serve the dashboard until Ctrl+C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("Dashboard server error")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
