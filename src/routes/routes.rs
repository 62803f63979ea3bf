//! Defines routes for object upload, lookup and delete.
//!
//! ## Structure
//! - **Object endpoints**
//!   - `POST   /objects`        — multipart upload, one or more files
//!   - `GET    /objects/{*key}` — public URL of an existing object
//!   - `DELETE /objects/{*key}` — delete an existing object
//!
//! - **Query-string endpoints** for older clients
//!   - `GET    /api/v1/image?name={key}`
//!   - `DELETE /api/v1/image?name={key}`
//!
//! The wildcard `*key` allows prefixed keys like `avatars/1b4e...9c.png`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{
            delete_image, delete_object, get_image_url, get_object_url, upload_objects,
        },
    },
    services::gateway::ObjectGateway,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Files one request may carry at the per-file size limit.
const MAX_FILES_PER_REQUEST: usize = 16;
/// Room for multipart boundaries and part headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router. The body limit follows `max_upload_bytes` from config;
/// the exact per-file limit is enforced by the gateway.
pub fn routes(max_upload_bytes: usize) -> Router<ObjectGateway> {
    let body_limit = max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/objects",
            post(upload_objects).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/objects/{*key}", get(get_object_url).delete(delete_object))
        .route("/api/v1/image", get(get_image_url).delete(delete_image))
}
