//! Upload requests and the records handed back to callers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A stored object as seen by the caller.
///
/// Created on successful upload and never written anywhere locally.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Store-unique key.
    pub key: String,

    /// Logical directory the key was generated under (may be empty).
    pub prefix: String,

    /// Derived from bucket, endpoint and key.
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// One file to upload. Consumed by a single `upload` call.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Caller's filename; only its extension survives into the key.
    pub original_filename: String,
    pub content: Bytes,
    pub content_type: String,
    pub prefix: String,
}

impl UploadRequest {
    pub fn new(
        original_filename: impl Into<String>,
        content: impl Into<Bytes>,
        content_type: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content: content.into(),
            content_type: content_type.into(),
            prefix: prefix.into(),
        }
    }
}

/// Body of `GET /objects/{key}`.
#[derive(Serialize, Deserialize, Debug)]
pub struct UrlResponse {
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// `?name=` query used by the `/api/v1/image` routes.
#[derive(Deserialize, Debug)]
pub struct NameQuery {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_public_url_field() {
        let record = ObjectRecord {
            key: "images/k.jpg".into(),
            prefix: "images".into(),
            public_url: "https://b.s3.example.com/images/k.jpg".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["publicURL"], "https://b.s3.example.com/images/k.jpg");
        assert_eq!(json["key"], "images/k.jpg");
    }
}
