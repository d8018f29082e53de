//! REST API layer: route handlers, DTOs, router composition, OpenAPI doc.
//!
//! Resource endpoints are mounted under `/api/v1`; system endpoints at the
//! root.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "twitch-relay",
        description = "Relays Twitch chat to browser viewers over WebSocket."
    ),
    paths(
        handlers::system::pong_handler,
        handlers::system::health_handler,
        handlers::channels::list_channels,
        handlers::channels::get_channel,
        handlers::channels::disconnect_channel,
    ),
    tags(
        (name = "System", description = "Liveness and health"),
        (name = "Channels", description = "Tenant inspection and control"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints and the
/// OpenAPI document.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_router())
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    Router::new()
        .merge(utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_path() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/ping/pong",
            "/health",
            "/api/v1/channels",
            "/api/v1/channels/{tenant}",
            "/api/v1/channels/{tenant}/disconnect",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
