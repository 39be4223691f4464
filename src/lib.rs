//! CSV Uploader Library
//!
//! Core of the csv-uploader tool: file validation, the upload controller,
//! upload history and the S3 storage backend. The binary in `main.rs` is a
//! thin terminal front end over these modules.

pub mod config;
pub mod controller;
pub mod file;
pub mod history;
pub mod preview;
pub mod s3;
pub mod sample;
pub mod upload;
