//! HTTP server initialization and routing

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, routing::get, Router};
use log::{error, info, warn};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::health::health_check;
use crate::call::configure_call_routes;
use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::institution::configure_institution_routes;
use crate::users::configure_user_routes;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") || origins.is_empty() {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}

/// Every API route plus health checks and the local media mount.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(ApiUrls::HEALTH, get(health_check))
        .route(ApiUrls::API_HEALTH, get(health_check))
        .merge(configure_user_routes())
        .merge(configure_institution_routes())
        .merge(configure_call_routes());

    // Only relative media URLs are served locally; absolute ones point at the drive.
    let media = &state.config.media;
    let mount = media.url.trim_matches('/');
    if media.url.starts_with('/') && !mount.is_empty() {
        router = router.nest_service(&format!("/{}", mount), ServeDir::new(&media.root));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.media.max_upload_bytes))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Trailing slashes are optional on every route.
    let app = NormalizePathLayer::trim_trailing_slash().layer(build_router(state));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(
        listener,
        axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(std::io::Error::other)
}
