//! S3 data types

use url::Url;

/// Bucket and key of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Url {
    pub bucket: String,
    pub key: String,
}

impl S3Url {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// HTTPS URL of the object.
    ///
    /// AWS objects use virtual-hosted addressing
    /// (`https://bucket.s3.region.amazonaws.com/key`). A custom endpoint puts
    /// the bucket in the path when `path_style` is set, otherwise in the host.
    /// Key segments are percent-encoded.
    pub fn object_url(
        &self,
        region: &str,
        endpoint: Option<&str>,
        path_style: bool,
    ) -> Option<String> {
        let base = match endpoint {
            Some(endpoint) if path_style => {
                let mut url = Url::parse(endpoint).ok()?;
                url.path_segments_mut().ok()?.pop_if_empty().push(&self.bucket);
                url
            }
            Some(endpoint) => {
                let mut url = Url::parse(endpoint).ok()?;
                let host = format!("{}.{}", self.bucket, url.host_str()?);
                url.set_host(Some(&host)).ok()?;
                url
            }
            None => {
                let aws = format!("https://{}.s3.{}.amazonaws.com/", self.bucket, region);
                Url::parse(&aws).ok()?
            }
        };

        let mut url = base;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(self.key.split('/'));
        Some(url.to_string())
    }
}
