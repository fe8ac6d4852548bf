use super::{AppState, build_router};
use crate::{config::ServerConfig, errors::Result};
use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

/// Binds the configured address and serves the API until Ctrl-C.
pub async fn serve(state: Arc<AppState>, config: &ServerConfig) -> Result<()> {
    let app = build_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeout_secs)))
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server is running on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
