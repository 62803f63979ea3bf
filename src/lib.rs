//! Upload gateway in front of an S3-compatible object store.
//!
//! Files come in over HTTP, get a collision-free key, are written to the
//! store with public-read visibility and are answered with their public URL.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use axum::Router;

use crate::services::gateway::ObjectGateway;

/// Full application router with `gateway` as shared state.
pub fn app(gateway: ObjectGateway) -> Router {
    let max_upload_bytes = gateway.config().max_upload_bytes;
    routes::routes::routes(max_upload_bytes).with_state(gateway)
}
