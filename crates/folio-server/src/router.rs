use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all Folio endpoints.
///
/// The resource route is mounted under the context's resource prefix so
/// the URLs documents generate resolve here.
pub fn build_router(state: AppState) -> Router {
    let resource_route = format!(
        "{}/:doc_type/:id/:version/*path",
        state.ctx.resource_prefix()
    );
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/documents", get(handler::list_handler))
        .route("/v1/documents/:doc_type/:id", get(handler::document_handler))
        .route(
            "/v1/documents/:doc_type/:id/history",
            get(handler::history_handler),
        )
        .route(
            "/v1/documents/:doc_type/:id/parts/*part",
            get(handler::part_handler),
        )
        .route("/v1/update", post(handler::update_handler))
        .route(&resource_route, get(handler::resource_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
