//! Upload requests, progress events and the object store seam
//!
//! The controller only talks to storage through [`ObjectStore`], so the S3
//! implementation in [`crate::s3`] can be swapped for an in-memory fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Prefix every uploaded object is stored under
pub const KEY_PREFIX: &str = "uploads";

/// Content type sent with every upload
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Bytes transferred so far out of the total body size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        Self { loaded, total }
    }

    /// Progress for a finished transfer of `total` bytes
    pub fn complete(total: u64) -> Self {
        Self { loaded: total, total }
    }

    /// Rounded percentage in `0..=100`
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return if self.loaded == 0 { 0 } else { 100 };
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Status line shown while the transfer runs
    pub fn status_text(&self) -> String {
        format!("Uploading: {}%", self.percentage())
    }
}

/// A single object to store
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

/// What the store reports back after a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub key: String,
    /// Final object URL
    pub location: String,
}

/// Problems with the user's selection. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a CSV file")]
    NotCsv { name: String },

    #[error("Please select a file first")]
    NoFileSelected,

    /// The form is waiting to reset after an upload
    #[error("Upload is not available until the form resets")]
    UploadDisabled,
}

/// Failure reported by the storage backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferError {
    message: String,
}

impl TransferError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Transfer(#[from] TransferError),
}

/// Callback receiving progress events during a transfer
pub type ProgressFn<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

/// Storage backend able to put a single object
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `request.body` under `request.key`, reporting progress as it goes
    async fn put_object(
        &self,
        request: UploadRequest,
        progress: ProgressFn<'_>,
    ) -> Result<UploadOutcome, TransferError>;
}

/// True when the file name ends in `.csv`, ignoring case
pub fn is_csv_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

pub fn validate_csv_name(name: &str) -> Result<(), ValidationError> {
    if is_csv_name(name) {
        Ok(())
    } else {
        Err(ValidationError::NotCsv {
            name: name.to_string(),
        })
    }
}

/// Build the object key `uploads/{millis}-{file_name}`
pub fn storage_key(file_name: &str, millis: i64) -> String {
    format!("{}/{}-{}", KEY_PREFIX, millis, file_name)
}

/// Hands out millisecond stamps for storage keys.
///
/// Stamps from one stamper strictly increase, so two uploads started within
/// the same millisecond still get distinct keys.
#[derive(Debug, Default)]
pub struct KeyStamper {
    last: Option<i64>,
}

impl KeyStamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) -> i64 {
        let millis = now.timestamp_millis();
        let millis = match self.last {
            Some(last) if millis <= last => last + 1,
            _ => millis,
        };
        self.last = Some(millis);
        millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_csv_name_accepts_any_case() {
        assert!(is_csv_name("data.csv"));
        assert!(is_csv_name("DATA.CSV"));
        assert!(is_csv_name("report.Csv"));
        assert!(is_csv_name("archive.tar.csv"));
    }

    #[test]
    fn test_is_csv_name_rejects_other_extensions() {
        assert!(!is_csv_name("data.txt"));
        assert!(!is_csv_name("data.csv.txt"));
        assert!(!is_csv_name("csv"));
        assert!(!is_csv_name("datacsv"));
        assert!(!is_csv_name(""));
    }

    #[test]
    fn test_validate_csv_name_error_message() {
        let err = validate_csv_name("data.txt").unwrap_err();
        assert_eq!(err.to_string(), "Please select a CSV file");
        assert_eq!(
            err,
            ValidationError::NotCsv {
                name: "data.txt".to_string()
            }
        );
    }

    #[test]
    fn test_storage_key_format() {
        assert_eq!(storage_key("data.csv", 169900), "uploads/169900-data.csv");
        assert_eq!(
            storage_key("my report.csv", 1700000000123),
            "uploads/1700000000123-my report.csv"
        );
    }

    #[test]
    fn test_key_stamper_uses_clock_millis() {
        let mut stamper = KeyStamper::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(stamper.stamp(now), 1_700_000_000_123);
    }

    #[test]
    fn test_key_stamper_never_repeats_within_same_millisecond() {
        let mut stamper = KeyStamper::new();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = stamper.stamp(now);
        let second = stamper.stamp(now);
        let third = stamper.stamp(now);
        assert_eq!(first, 1_700_000_000_000);
        assert_eq!(second, 1_700_000_000_001);
        assert_eq!(third, 1_700_000_000_002);

        // A later clock reading takes over again
        let later = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        assert_eq!(stamper.stamp(later), 1_700_000_000_500);
    }

    #[test]
    fn test_progress_percentage_rounds() {
        assert_eq!(UploadProgress::new(0, 200).percentage(), 0);
        assert_eq!(UploadProgress::new(1, 3).percentage(), 33);
        assert_eq!(UploadProgress::new(2, 3).percentage(), 67);
        assert_eq!(UploadProgress::new(200, 200).percentage(), 100);
        assert_eq!(UploadProgress::complete(0).percentage(), 0);
    }

    #[test]
    fn test_progress_status_text() {
        assert_eq!(UploadProgress::new(1, 2).status_text(), "Uploading: 50%");
    }

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::from(TransferError::new("network error"));
        assert_eq!(err.to_string(), "Upload failed: network error");

        let err = UploadError::from(ValidationError::NoFileSelected);
        assert_eq!(err.to_string(), "Please select a file first");
    }
}
