//! Consumer server using Axum
//!
//! Accepts the shapes the pipeline emits so a full run can be observed end
//! to end without an external service:
//! - impedance triples posted by the HTTP sink
//! - spectrum batches posted by the direct generator

mod handlers;
mod routes;

pub use handlers::{BatchAck, ConsumerState, HealthResponse, PointsAck, BANNER};

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Comma-separated allowed origins for cross-origin clients.
pub const CORS_ENV_VAR: &str = "DEIS_CORS_ORIGINS";

/// CORS layer that is same-origin unless `DEIS_CORS_ORIGINS` lists origins.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Complete consumer application with middleware.
pub fn create_app(state: ConsumerState) -> Router {
    routes::consumer_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
