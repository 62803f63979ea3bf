//! HTTP handlers for object upload, lookup and delete.
//! Request parsing and status mapping live here; everything else is delegated
//! to `ObjectGateway`.

use crate::{
    errors::AppError,
    models::object::{NameQuery, ObjectRecord, UploadRequest, UrlResponse},
    services::gateway::{GatewayError, ObjectGateway},
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::{Bytes, BytesMut};
use tracing::debug;

const PREFIX_FIELD: &str = "prefix";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `POST /objects` — multipart upload of one or more files.
///
/// Every part carrying a filename is treated as a file and uploaded as soon
/// as it has been read, so at most one file is buffered at a time. A `prefix`
/// text part must come before the file parts it applies to. The response
/// preserves body order. The first failure aborts the request; files stored
/// before it are kept.
pub async fn upload_objects(
    State(gateway): State<ObjectGateway>,
    mut multipart: Multipart,
) -> Result<Json<Vec<ObjectRecord>>, AppError> {
    let mut prefix = String::new();
    let mut records = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.file_name().map(str::to_string) {
            Some(original_filename) => {
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let content = read_capped(field, gateway.config().max_upload_bytes).await?;
                let request =
                    UploadRequest::new(original_filename, content, content_type, prefix.clone());
                records.push(gateway.upload(request).await?);
            }
            None if field.name() == Some(PREFIX_FIELD) => {
                if !records.is_empty() {
                    return Err(AppError::bad_request(
                        "`prefix` must come before the file parts",
                    ));
                }
                prefix = field.text().await?;
            }
            None => {
                debug!(name = ?field.name(), "ignoring unknown multipart field");
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::bad_request("no files in multipart body"));
    }
    Ok(Json(records))
}

/// Read one file part, giving up as soon as it grows past `limit`.
async fn read_capped(mut field: Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        let size = buf.len() + chunk.len();
        if size > limit {
            return Err(GatewayError::PayloadTooLarge { size, limit }.into());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// `GET /objects/{*key}` — public URL of an existing object.
pub async fn get_object_url(
    State(gateway): State<ObjectGateway>,
    Path(key): Path<String>,
) -> Result<Json<UrlResponse>, AppError> {
    let public_url = gateway.get_url(&key).await?;
    Ok(Json(UrlResponse { public_url }))
}

/// `DELETE /objects/{*key}`
pub async fn delete_object(
    State(gateway): State<ObjectGateway>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    gateway.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/image?name=` — plain-text URL, kept for older clients.
pub async fn get_image_url(
    State(gateway): State<ObjectGateway>,
    Query(query): Query<NameQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(gateway.get_url(&query.name).await?)
}

/// `DELETE /api/v1/image?name=`
pub async fn delete_image(
    State(gateway): State<ObjectGateway>,
    Query(query): Query<NameQuery>,
) -> Result<impl IntoResponse, AppError> {
    gateway.delete(&query.name).await?;
    Ok(format!("Success to delete {}", query.name))
}
