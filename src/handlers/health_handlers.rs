//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the object store and staging I/O

use crate::services::{gateway::ObjectGateway, staging::StagedFile};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Asks the store whether a random probe key exists (any answer is fine,
///    an error is not).
/// 2. Writes, reads back and releases a staging file.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(gateway): State<ObjectGateway>) -> impl IntoResponse {
    let probe = format!(".readyz-{}", Uuid::new_v4());

    // 1) Store round-trip
    let store_check = match gateway.store().exists(&probe).await {
        Ok(_) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    // 2) Staging write/read/delete
    let staging_dir = &gateway.config().staging_dir;
    let staging_check = match StagedFile::write(staging_dir, b"readyz").await {
        Ok(staged) => {
            let read_back = fs::read(staged.path()).await;
            let released = staged.release().await;
            match (read_back, released) {
                (Ok(bytes), Ok(())) if bytes == b"readyz" => (true, None),
                (Ok(bytes), Err(e)) if bytes == b"readyz" => {
                    (true, Some(format!("could not remove staging file: {}", e)))
                }
                (Ok(_), _) => (false, Some("staging file content mismatch".to_string())),
                (Err(e), _) => (false, Some(format!("could not read staging file: {}", e))),
            }
        }
        Err(e) => (false, Some(format!("could not write staging file: {}", e))),
    };

    let overall_ok = store_check.0 && staging_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        gateway.store().name(),
        CheckStatus {
            ok: store_check.0,
            error: store_check.1,
        },
    );
    checks.insert(
        "staging",
        CheckStatus {
            ok: staging_check.0,
            error: staging_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok { "ok".into() } else { "error".into() },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
