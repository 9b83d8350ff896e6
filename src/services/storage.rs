use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;

/// Failure reported by an object store backend. `Unavailable` means the store
/// could not be reached at all; `Rejected` means this one object failed.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("object rejected: {0}")]
    Rejected(String),
}

impl StorageError {
    /// True when `err` carries a `StorageError::Unavailable`
    pub fn is_unavailable(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::Unavailable(_))
        )
    }
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stores `data` under `key` and returns the public URL for it
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    /// Also serves as the reachability check behind `/health`
    async fn file_exists(&self, key: &str) -> Result<bool>;
    fn public_url(&self, key: &str) -> String;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StorageError::Unavailable(format!("{:?}", err))
        }
        other => StorageError::Rejected(format!("{:?}", other)),
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 put_object failed: key={}, size={}", key, size);
                classify_sdk_error(e)
            })?;

        Ok(self.public_url(key))
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ctx)) if ctx.err().is_not_found() => Ok(false),
            Err(e) => Err(classify_sdk_error(e).into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}
