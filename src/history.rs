//! Upload history
//!
//! A short, most-recent-first list of completed uploads. The whole list is
//! persisted through a [`HistoryStore`] after every change.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::project_dirs;

/// Maximum number of entries kept
pub const HISTORY_LIMIT: usize = 10;

/// Shown in place of the list when there is nothing to show
pub const EMPTY_HISTORY_TEXT: &str = "No upload history";

const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Record of one completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub file_name: String,
    pub file_url: String,
    /// Local time, for display
    pub timestamp: String,
    /// ISO-8601 UTC
    pub date: String,
}

impl HistoryEntry {
    pub fn new(
        file_name: impl Into<String>,
        file_url: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_url: file_url.into(),
            timestamp: at.with_timezone(&Local).format(DISPLAY_FORMAT).to_string(),
            date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Bounded list of history entries, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadHistory {
    entries: Vec<HistoryEntry>,
}

impl UploadHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored entries, dropping anything past the limit
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_LIMIT);
        Self { entries }
    }

    /// Insert at the front, evicting the oldest entry when full
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render the list in full, one line per entry
    pub fn render_lines(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![EMPTY_HISTORY_TEXT.to_string()];
        }

        self.entries
            .iter()
            .map(|entry| format!("{}  {}", entry.file_name, entry.timestamp))
            .collect()
    }
}

/// Persistence for the upload history
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<UploadHistory>;
    fn save(&self, history: &UploadHistory) -> Result<()>;
}

/// History kept as a JSON array in a single file
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform data folder, e.g. ~/.local/share/csv-uploader/upload_history.json
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(project_dirs()?.data_dir().join("upload_history.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> Result<UploadHistory> {
        if !self.path.exists() {
            tracing::debug!("History file not found, starting empty");
            return Ok(UploadHistory::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history from {:?}", self.path))?;

        let entries: Vec<HistoryEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse history from {:?}", self.path))?;

        tracing::debug!("Loaded {} history entries", entries.len());

        Ok(UploadHistory::from_entries(entries))
    }

    fn save(&self, history: &UploadHistory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory {:?}", parent))?;
        }

        let contents = serde_json::to_string(history).context("Failed to serialize history")?;

        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write history to {:?}", self.path))?;

        Ok(())
    }
}

/// In-memory store. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    inner: Arc<Mutex<UploadHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: UploadHistory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(history)),
        }
    }

    /// Copy of what was last saved
    pub fn snapshot(&self) -> UploadHistory {
        self.inner
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<UploadHistory> {
        let history = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("History store lock poisoned"))?;
        Ok(history.clone())
    }

    fn save(&self, history: &UploadHistory) -> Result<()> {
        let mut stored = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("History store lock poisoned"))?;
        *stored = history.clone();
        Ok(())
    }
}
