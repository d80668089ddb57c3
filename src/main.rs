use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use daybook_api::config::AppConfig;
use daybook_api::context::AppContext;
use daybook_api::handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("DAYBOOK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = AppConfig::load(&PathBuf::from(&config_path))?;

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = config.server.port;
    let ctx = Arc::new(AppContext::new(config).await?);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("daybook-api listening on http://{}", bind_addr);

    axum::serve(listener, app(ctx)).await?;
    Ok(())
}

fn app(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/logout", post(handlers::auth::logout))
        .route("/api/welcome", get(handlers::auth::welcome))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health(State(ctx): State<Arc<AppContext>>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match ctx.db.ping().await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            axum::Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
