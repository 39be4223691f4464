//! The file picked for upload

use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use std::io;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Where the file's bytes come from
#[derive(Debug, Clone)]
enum FileContent {
    /// Read from disk when needed
    Path(PathBuf),
    /// Already in memory, e.g. handed over by a drop target
    Bytes(Bytes),
}

/// A file chosen by the user, owned by the controller until upload or reset
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    content: FileContent,
}

/// What the file details panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDetails {
    pub name: String,
    /// Size in MB with two decimals
    pub size_mb: String,
    /// Local time, human readable
    pub last_modified: String,
}

impl SelectedFile {
    /// Describe a file on disk without reading it
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Self {
            name,
            size_bytes: metadata.len(),
            last_modified,
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    /// Wrap bytes that are already in memory
    pub fn from_bytes(
        name: impl Into<String>,
        data: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size_bytes: data.len() as u64,
            last_modified,
            content: FileContent::Bytes(data),
        }
    }

    /// Size in megabytes, two decimals
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / BYTES_PER_MB)
    }

    pub fn details(&self) -> FileDetails {
        FileDetails {
            name: self.name.clone(),
            size_mb: self.size_mb(),
            last_modified: self
                .last_modified
                .with_timezone(&Local)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string(),
        }
    }

    /// Full content of the file
    pub async fn read(&self) -> io::Result<Bytes> {
        match &self.content {
            FileContent::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            FileContent::Bytes(data) => Ok(data.clone()),
        }
    }
}
