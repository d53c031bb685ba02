//! Request dispatch for the paste service.
//!
//! ## Structure
//! - `GET    /`        — index page
//! - `POST   /`, `/*`  — upload a paste
//! - `DELETE /`        — delete a paste (`?raw=&html=&key=`); other paths → 400
//! - `GET    /{*key}`  — serve a stored object (HEAD supported)
//! - `GET    /healthz`, `/readyz` — liveness and readiness
//!
//! Every other method on every path is a 400, including `HEAD /`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{get_object, head_object},
        paste_handlers::{delete, delete_elsewhere, index, unsupported_method, upload},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{MethodRouter, get},
};
use tower_http::trace::TraceLayer;

/// Build the router without state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(index)
                .head(unsupported_method)
                .post(upload)
                .delete(delete)
                .fallback(unsupported_method),
        )
        .route("/healthz", with_upload(get(healthz)))
        .route("/readyz", with_upload(get(readyz)))
        .route("/{*key}", with_upload(get(get_object).head(head_object)))
}

/// Any non-root path also accepts uploads and rejects deletes.
fn with_upload(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router
        .post(upload)
        .delete(delete_elsewhere)
        .fallback(unsupported_method)
}

/// Full application: routes, upload size bound, request tracing and state.
pub fn app(state: AppState) -> Router {
    let body_limit = state.settings.multipart_max_memory;
    routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
