//! Proxy Server - Axum HTTP server

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ProxyError;
use crate::proxy::rate_limit::RateLimiter;
use crate::proxy::tokenizer::{TiktokenEstimator, TokenEstimator};
use crate::proxy::upstream::client::UpstreamClient;

/// Application state shared across handlers. Everything here is read-only
/// except the rate limiter's last-request slot.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub custom_mapping: Arc<HashMap<String, String>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub estimator: Arc<dyn TokenEstimator>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(&config.upstream, config.timeouts.request_timeout)?;
        Ok(Self {
            upstream: Arc::new(upstream),
            custom_mapping: Arc::new(config.model_mapping.custom.clone()),
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit.interval_seconds,
                config.rate_limit.wait,
            )),
            estimator: Arc::new(TiktokenEstimator::new()),
        })
    }
}

/// Routes plus the CORS, trace and body-limit layers
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/healthz", get(health_check_handler))
        .route("/health", get(health_check_handler))
        // Gemini endpoints
        .route(
            "/v1beta/models/:model_action",
            post(crate::proxy::handlers::gemini::handle_gemini_request),
        )
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Proxy server instance
pub struct ProxyServer {
    host: String,
    port: u16,
    state: AppState,
}

impl ProxyServer {
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        Ok(Self {
            host: config.server.bind_host().to_string(),
            port: config.server.port,
            state: AppState::from_config(config)?,
        })
    }

    /// Run the proxy server (blocking)
    pub async fn run(self) -> anyhow::Result<()> {
        let app = build_router(self.state);

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Proxy server listening on {}", addr);

        // Handle graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
