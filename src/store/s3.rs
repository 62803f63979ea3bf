//! S3-compatible store backed by the AWS SDK.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client, error::DisplayErrorContext, primitives::ByteStream, types::ObjectCannedAcl,
};
use base64::{Engine as _, engine::general_purpose};
use tracing::warn;

use super::{ObjectStore, PutBody, PutMetadata, StoreError, StoreResult, Visibility};
use crate::config::AppConfig;

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the process config. Static credentials are used
    /// when configured, otherwise the default AWS credential chain.
    pub async fn new(cfg: &AppConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()));

        if let Some(creds) = &cfg.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "object-gateway",
            ));
        }
        if let Some(endpoint) = &cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(cfg.path_style)
                .build(),
        );

        Self {
            client,
            bucket: cfg.bucket.clone(),
        }
    }

    fn backend_error(op: &str, key: &str, err: impl std::fmt::Display) -> StoreError {
        warn!(op, key, "s3 request failed: {}", err);
        StoreError::Backend(format!("{} `{}`: {}", op, key, err))
    }
}

/// Full cause chain of an SDK error. Timeouts and dispatch failures carry no
/// service error, so `into_service_error()` alone would hide them.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    DisplayErrorContext(err).to_string()
}

/// S3 expects the base64 of the raw digest, not the hex etag form.
fn content_md5(digest: &md5::Digest) -> String {
    general_purpose::STANDARD.encode(digest.0)
}

fn canned_acl(visibility: Visibility) -> ObjectCannedAcl {
    match visibility {
        Visibility::PublicRead => ObjectCannedAcl::PublicRead,
        Visibility::Private => ObjectCannedAcl::Private,
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &str, body: PutBody, metadata: &PutMetadata) -> StoreResult<()> {
        let stream = match body {
            PutBody::Bytes(bytes) => ByteStream::from(bytes),
            PutBody::File(path) => ByteStream::from_path(&path)
                .await
                .map_err(|err| Self::backend_error("put_object", key, err))?,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .content_type(&metadata.content_type)
            .content_length(metadata.content_length as i64)
            .content_md5(content_md5(&metadata.md5))
            .acl(canned_acl(metadata.visibility))
            .send()
            .await
            .map_err(|err| Self::backend_error("put_object", key, describe(&err)))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service) if service.is_not_found() => Ok(false),
                _ => Err(Self::backend_error("head_object", key, describe(&err))),
            },
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| Self::backend_error("delete_object", key, describe(&err)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::{error::SdkError, operation::head_object::HeadObjectError};

    #[test]
    fn content_md5_is_base64_of_raw_digest() {
        let digest = md5::compute(b"hello");
        assert_eq!(content_md5(&digest), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[test]
    fn public_objects_get_public_read_acl() {
        assert_eq!(canned_acl(Visibility::PublicRead), ObjectCannedAcl::PublicRead);
    }

    #[test]
    fn transport_errors_keep_their_cause() {
        let err: SdkError<HeadObjectError> = SdkError::timeout_error("connect timed out");
        let described = describe(&err);
        assert!(described.contains("connect timed out"), "{described}");

        match S3Store::backend_error("head_object", "a/b.png", described) {
            StoreError::Backend(message) => {
                assert!(message.starts_with("head_object `a/b.png`: "), "{message}");
                assert!(message.contains("connect timed out"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
