//! AWS S3 client wrapper

use anyhow::{anyhow, Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::UploaderConfig;
use crate::s3::credentials::{CognitoCredentialsProvider, CredentialSource};
use crate::s3::types::S3Url;
use crate::upload::{ProgressFn, UploadProgress};

/// Bodies larger than this go through a multipart upload
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Smallest part S3 accepts for anything but the last part
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Explicit connection settings, used for S3-compatible stores and tests
#[derive(Debug, Clone, Default)]
pub struct S3ClientConfig {
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// S3 client wrapper with high-level operations
pub struct S3Client {
    client: Client,
    current_region: String,
    endpoint_url: Option<String>,
    force_path_style: bool,
    part_size: usize,
}

fn sdk_error(err: impl std::error::Error) -> anyhow::Error {
    anyhow!("{}", DisplayErrorContext(err))
}

impl S3Client {
    /// Create a client for the configured region and credential source
    pub async fn new(config: &UploaderConfig) -> Result<Self> {
        let source = CredentialSource::from_config(config);
        tracing::info!("Using {} credentials in {}", source.as_str(), config.region);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        loader = match source {
            CredentialSource::IdentityPool(pool) => loader
                .credentials_provider(CognitoCredentialsProvider::new(&config.region, &pool).await),
            CredentialSource::Profile(profile) => loader.profile_name(profile),
            CredentialSource::DefaultChain => loader,
        };

        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(config.force_path_style);

        Ok(Self {
            client: Client::from_conf(builder.build()),
            current_region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            force_path_style: config.force_path_style,
            part_size: DEFAULT_PART_SIZE,
        })
    }

    /// Create a client with static credentials and an explicit endpoint
    pub async fn with_config(config: S3ClientConfig) -> Result<Self> {
        let region = config.region.unwrap_or_else(|| "us-east-1".to_string());

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .force_path_style(config.force_path_style);

        if let (Some(access_key), Some(secret_key)) =
            (config.access_key_id, config.secret_access_key)
        {
            builder = builder.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            current_region: region,
            endpoint_url: config.endpoint_url,
            force_path_style: config.force_path_style,
            part_size: DEFAULT_PART_SIZE,
        })
    }

    /// Use a different multipart threshold and part size (at least 5 MiB)
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(MIN_PART_SIZE);
        self
    }

    /// Upload a body, reporting progress, and return the object URL.
    ///
    /// Bodies up to the part size use a single PutObject; larger ones use a
    /// multipart upload with progress reported after every part.
    pub async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        progress: ProgressFn<'_>,
    ) -> Result<String> {
        let total = body.len() as u64;
        progress(UploadProgress::new(0, total));

        if body.len() <= self.part_size {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(sdk_error)?;

            progress(UploadProgress::complete(total));
            return self.object_url(bucket, key);
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(sdk_error)?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| anyhow!("No upload ID"))?
            .to_string();

        match self.upload_parts(bucket, key, &upload_id, body, progress).await {
            Ok(location) => Ok(location),
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        "Failed to abort multipart upload {}: {}",
                        upload_id,
                        DisplayErrorContext(abort_err)
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        body: Bytes,
        progress: ProgressFn<'_>,
    ) -> Result<String> {
        let total = body.len() as u64;
        let mut completed_parts = Vec::new();
        let mut part_number = 1;
        let mut offset = 0;

        while offset < body.len() {
            let end = (offset + self.part_size).min(body.len());
            let chunk = body.slice(offset..end);

            let part = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(sdk_error)
                .with_context(|| format!("Part {} failed", part_number))?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(part.e_tag().unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );

            tracing::debug!("Uploaded part {} of {}", part_number, key);
            progress(UploadProgress::new(end as u64, total));

            offset = end;
            part_number += 1;
        }

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(sdk_error)?;

        match output.location() {
            Some(location) if !location.is_empty() => Ok(location.to_string()),
            _ => self.object_url(bucket, key),
        }
    }

    /// Download an object to bytes
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;

        let data = response.body.collect().await?;
        Ok(data.into_bytes().to_vec())
    }

    /// Content type stored with an object
    pub async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(response.content_type().map(str::to_string))
    }

    /// Create a bucket
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    /// HTTPS URL for an object in this client's region or endpoint
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<String> {
        S3Url::new(bucket, key)
            .object_url(
                &self.current_region,
                self.endpoint_url.as_deref(),
                self.force_path_style,
            )
            .with_context(|| format!("Cannot build URL for s3://{}/{}", bucket, key))
    }

    /// Get the current region
    pub fn region(&self) -> &str {
        &self.current_region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> S3ClientConfig {
        S3ClientConfig {
            endpoint_url: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            region: Some("us-east-1".to_string()),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
        }
    }

    #[tokio::test]
    async fn test_with_config_defaults_region() {
        let client = S3Client::with_config(S3ClientConfig::default()).await.unwrap();
        assert_eq!(client.region(), "us-east-1");
    }

    #[tokio::test]
    async fn test_object_url_uses_endpoint() {
        let client = S3Client::with_config(local_config()).await.unwrap();
        assert_eq!(
            client.object_url("data", "uploads/1-a.csv").unwrap(),
            "http://localhost:9000/data/uploads/1-a.csv"
        );
    }

    #[tokio::test]
    async fn test_part_size_has_floor() {
        let client = S3Client::with_config(local_config())
            .await
            .unwrap()
            .with_part_size(1024);
        assert_eq!(client.part_size, MIN_PART_SIZE);
    }
}
