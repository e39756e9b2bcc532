//! Object storage access - trait seam plus the S3-backed implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client};
use tracing::debug;

/// Durable object storage as the pipeline sees it: text in, text out.
///
/// `get_text` distinguishes "object does not exist" (`Ok(None)`) from every
/// other failure (`Err`), which the checkpoint store relies on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_text(&self, key: &str) -> Result<Option<String>>;
    async fn put_text(&self, key: &str, body: String) -> Result<()>;
}

/// S3 client bound to a single bucket
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn get_text(&self, key: &str) -> Result<Option<String>> {
        debug!("Downloading from s3://{}/{}", self.bucket, key);

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None);
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Failed to download from s3://{}/{}",
                    self.bucket, key
                ));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes();

        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket,
            key
        );

        let text = String::from_utf8(data.to_vec()).context(format!(
            "Object s3://{}/{} is not valid UTF-8",
            self.bucket, key
        ))?;

        Ok(Some(text))
    }

    async fn put_text(&self, key: &str, body: String) -> Result<()> {
        debug!(
            "Uploading {} bytes to s3://{}/{}",
            body.len(),
            self.bucket,
            key
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await
            .context(format!(
                "Failed to upload to s3://{}/{}",
                self.bucket, key
            ))?;

        Ok(())
    }
}
