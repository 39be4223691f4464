//! [`ObjectStore`] backed by an S3 bucket

use async_trait::async_trait;

use crate::s3::client::S3Client;
use crate::upload::{ObjectStore, ProgressFn, TransferError, UploadOutcome, UploadRequest};

/// Uploads every object into one bucket
pub struct S3BucketStore {
    client: S3Client,
    bucket: String,
}

impl S3BucketStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3BucketStore {
    async fn put_object(
        &self,
        request: UploadRequest,
        progress: ProgressFn<'_>,
    ) -> Result<UploadOutcome, TransferError> {
        let location = self
            .client
            .upload_object(
                &self.bucket,
                &request.key,
                request.body,
                &request.content_type,
                progress,
            )
            .await
            .map_err(|e| TransferError::new(format!("{:#}", e)))?;

        Ok(UploadOutcome {
            key: request.key,
            location,
        })
    }
}
