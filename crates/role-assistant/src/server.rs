//! Server startup
//!
//! Loads the knowledge documents, wires the completion client and the
//! orchestrator into `UnifiedAppState` once, then serves the router. The only
//! network call made while answering is to the configured completion service.

use std::time::Duration;
use tracing::info;

use crate::{config::Config, shared_state::UnifiedAppState};

/// Run the HTTP server until it exits. A knowledge load failure aborts
/// startup before the listener is bound.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics()?;
    cfg.print_config();

    info!("Starting {}", cfg.app_name);

    let state = UnifiedAppState::from_config(&cfg)?;

    let addr = cfg.api_addr()?;
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = build_router(state, cfg.request_timeout());

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: UnifiedAppState, request_timeout: Duration) -> axum::Router {
    use axum::{
        routing::{get, post},
        Router,
    };
    use tower::ServiceBuilder;
    use tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(crate::api::assistant_api::home))
        .route("/api/ask", post(crate::api::assistant_api::ask))
        .route("/healthz", get(|| async { "OK" }))
        .route("/metrics", get(crate::metrics::get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors),
        )
        .with_state(state)
}
