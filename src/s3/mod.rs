//! S3 storage module
//!
//! This module provides:
//! - [`client::S3Client`] - S3 client wrapper with progress-reporting uploads
//! - [`credentials::CognitoCredentialsProvider`] - identity pool credential exchange
//! - [`store::S3BucketStore`] - the bucket-backed [`crate::upload::ObjectStore`]
//! - [`types`] - S3 data types (S3Url)

pub mod client;
pub mod credentials;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::{S3Client, S3ClientConfig};
pub use credentials::{CognitoCredentialsProvider, CredentialSource};
pub use store::S3BucketStore;
pub use types::S3Url;
