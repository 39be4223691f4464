//! Upload controller
//!
//! Owns everything the upload form shows: the selected file, the status line,
//! the progress indicator and the history list. Front ends drive it with
//! [`UploadController::select_file`], [`UploadController::upload`] and
//! [`UploadController::tick`], and read the rest back through accessors.
//!
//! State flow: `Idle -> FileSelected -> Uploading -> (Succeeded | Failed)`.
//! `Succeeded` returns to `Idle` once the reset delay has passed; `Failed`
//! keeps the selection so the upload can be retried.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::file::{FileDetails, SelectedFile};
use crate::history::{HistoryEntry, HistoryStore, UploadHistory};
use crate::upload::{
    storage_key, validate_csv_name, KeyStamper, ObjectStore, TransferError, UploadError,
    UploadOutcome, UploadProgress, UploadRequest, ValidationError, CSV_CONTENT_TYPE,
};

/// How long transient messages stay before the form settles
pub const MESSAGE_DURATION: Duration = Duration::from_secs(3);

pub const IDLE_STATUS: &str = "No active uploads";
pub const UPLOADING_STATUS: &str = "Uploading file...";
pub const SUCCESS_STATUS: &str = "Upload completed successfully!";
pub const READY_STATUS: &str = "Ready for next upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    FileSelected,
    Uploading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Current status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PendingTimer {
    ClearError(Instant),
    ResetForm(Instant),
}

pub struct UploadController<S, H> {
    store: S,
    history_store: H,
    history: UploadHistory,
    selected: Option<SelectedFile>,
    state: UploadState,
    status: Status,
    upload_enabled: bool,
    progress: watch::Sender<UploadProgress>,
    stamper: KeyStamper,
    timer: Option<PendingTimer>,
}

impl<S: ObjectStore, H: HistoryStore> UploadController<S, H> {
    /// Create a controller, loading the persisted history
    pub fn new(store: S, history_store: H) -> Self {
        let history = history_store.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load upload history, starting empty: {:#}", e);
            UploadHistory::new()
        });
        let (progress, _) = watch::channel(UploadProgress::default());

        Self {
            store,
            history_store,
            history,
            selected: None,
            state: UploadState::Idle,
            status: Status::new(IDLE_STATUS, StatusKind::Info),
            upload_enabled: false,
            progress,
            stamper: KeyStamper::new(),
            timer: None,
        }
    }

    /// Validate and keep a file for upload.
    ///
    /// Anything not named `*.csv` is discarded, along with any earlier
    /// selection, and a transient error is shown.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<FileDetails, ValidationError> {
        if let Err(err) = validate_csv_name(&file.name) {
            tracing::debug!("Rejected selection {:?}", file.name);
            self.clear_selection();
            self.show_error(err.to_string());
            return Err(err);
        }

        // A new selection supersedes a pending post-upload reset
        if matches!(self.timer, Some(PendingTimer::ResetForm(_))) {
            self.timer = None;
            self.status = Status::new(READY_STATUS, StatusKind::Info);
            self.progress.send_replace(UploadProgress::default());
        }

        tracing::info!("Selected {} ({} bytes)", file.name, file.size_bytes);
        let details = file.details();
        self.selected = Some(file);
        self.state = UploadState::FileSelected;
        self.upload_enabled = true;
        Ok(details)
    }

    /// Upload the selected file and record it in the history.
    ///
    /// Takes `&mut self`, so a controller never runs two uploads at once.
    /// While the upload control is disabled the call is rejected and the
    /// form is left untouched.
    pub async fn upload(&mut self) -> Result<UploadOutcome, UploadError> {
        let Some(file) = self.selected.clone() else {
            let err = ValidationError::NoFileSelected;
            self.show_error(err.to_string());
            return Err(err.into());
        };
        if !self.upload_enabled {
            tracing::debug!("Ignoring upload of {} while disabled", file.name);
            return Err(ValidationError::UploadDisabled.into());
        }

        self.upload_enabled = false;
        self.state = UploadState::Uploading;
        self.timer = None;
        self.status = Status::new(UPLOADING_STATUS, StatusKind::Info);
        self.progress.send_replace(UploadProgress::default());

        let body = match file.read().await {
            Ok(body) => body,
            Err(e) => {
                return Err(self.fail(TransferError::new(format!("Failed to read file: {}", e))));
            }
        };
        let total = body.len() as u64;

        let key = storage_key(&file.name, self.stamper.stamp(Utc::now()));
        tracing::info!("Uploading {} as {}", file.name, key);

        let request = UploadRequest {
            key,
            body,
            content_type: CSV_CONTENT_TYPE.to_string(),
        };

        let progress = &self.progress;
        let on_progress = move |p: UploadProgress| {
            progress.send_replace(p);
        };

        let result = self.store.put_object(request, &on_progress).await;

        match result {
            Ok(outcome) => {
                tracing::info!("Uploaded {} to {}", file.name, outcome.location);
                self.state = UploadState::Succeeded;
                self.status = Status::new(SUCCESS_STATUS, StatusKind::Success);
                self.progress.send_replace(UploadProgress::complete(total));
                self.record(&file.name, &outcome.location);
                self.timer = Some(PendingTimer::ResetForm(Instant::now() + MESSAGE_DURATION));
                Ok(outcome)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Apply any timer that has expired by `now`
    pub fn tick(&mut self, now: Instant) {
        match self.timer {
            Some(PendingTimer::ClearError(at)) if now >= at => {
                self.timer = None;
                self.status = Status::new(IDLE_STATUS, StatusKind::Info);
            }
            Some(PendingTimer::ResetForm(at)) if now >= at => {
                self.timer = None;
                self.clear_selection();
                self.status = Status::new(READY_STATUS, StatusKind::Info);
                self.progress.send_replace(UploadProgress::default());
            }
            _ => {}
        }
    }

    /// When the pending timer fires, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.timer {
            Some(PendingTimer::ClearError(at)) | Some(PendingTimer::ResetForm(at)) => Some(at),
            None => None,
        }
    }

    /// Empty the history and persist the empty list
    pub fn clear_history(&mut self) -> anyhow::Result<()> {
        self.history.clear();
        self.history_store.save(&self.history)
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_upload_enabled(&self) -> bool {
        self.upload_enabled
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn file_details(&self) -> Option<FileDetails> {
        self.selected.as_ref().map(SelectedFile::details)
    }

    pub fn history(&self) -> &UploadHistory {
        &self.history
    }

    pub fn history_lines(&self) -> Vec<String> {
        self.history.render_lines()
    }

    pub fn progress(&self) -> UploadProgress {
        *self.progress.borrow()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress().percentage()
    }

    /// Receive progress updates, including those sent while an upload runs
    pub fn subscribe_progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    fn fail(&mut self, err: TransferError) -> UploadError {
        tracing::error!("Upload error: {}", err);
        self.state = UploadState::Failed;
        self.upload_enabled = true;
        self.status = Status::new(format!("Upload failed: {}", err.message()), StatusKind::Error);
        err.into()
    }

    fn record(&mut self, file_name: &str, file_url: &str) {
        self.history.push(HistoryEntry::new(file_name, file_url, Utc::now()));
        if let Err(e) = self.history_store.save(&self.history) {
            tracing::warn!("Failed to save upload history: {:#}", e);
        }
    }

    fn show_error(&mut self, message: String) {
        self.status = Status::new(message, StatusKind::Error);
        self.timer = Some(PendingTimer::ClearError(Instant::now() + MESSAGE_DURATION));
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.upload_enabled = false;
        if self.state != UploadState::Uploading {
            self.state = UploadState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::upload::ProgressFn;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records requests and answers with a fixed result
    struct FakeStore {
        fail_with: Option<String>,
        requests: Mutex<Vec<UploadRequest>>,
    }

    impl FakeStore {
        fn ok() -> Self {
            Self {
                fail_with: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put_object(
            &self,
            request: UploadRequest,
            progress: ProgressFn<'_>,
        ) -> Result<UploadOutcome, TransferError> {
            let total = request.body.len() as u64;
            progress(UploadProgress::new(total / 2, total));
            self.requests.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(message) => Err(TransferError::new(message.clone())),
                None => Ok(UploadOutcome {
                    location: format!("https://bucket/{}", request.key),
                    key: request.key,
                }),
            }
        }
    }

    fn csv_file(name: &str) -> SelectedFile {
        SelectedFile::from_bytes(name, b"a,b\n1,2\n".to_vec(), Utc::now())
    }

    #[test]
    fn test_new_controller_is_idle() {
        let controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        assert_eq!(controller.state(), UploadState::Idle);
        assert_eq!(controller.status().text, IDLE_STATUS);
        assert!(!controller.is_upload_enabled());
        assert!(controller.selected_file().is_none());
        assert_eq!(controller.history_lines(), vec!["No upload history"]);
    }

    #[test]
    fn test_select_csv_enables_upload() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        let details = controller.select_file(csv_file("Data.CSV")).unwrap();

        assert_eq!(details.name, "Data.CSV");
        assert_eq!(controller.state(), UploadState::FileSelected);
        assert!(controller.is_upload_enabled());
        assert_eq!(controller.file_details().unwrap().name, "Data.CSV");
    }

    #[test]
    fn test_select_non_csv_discards_previous_selection() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        controller.select_file(csv_file("good.csv")).unwrap();

        let err = controller.select_file(csv_file("bad.txt")).unwrap_err();
        assert!(matches!(err, ValidationError::NotCsv { .. }));
        assert!(controller.selected_file().is_none());
        assert!(!controller.is_upload_enabled());
        assert_eq!(controller.state(), UploadState::Idle);
        assert_eq!(controller.status().text, "Please select a CSV file");
        assert_eq!(controller.status().kind, StatusKind::Error);
    }

    #[test]
    fn test_error_message_clears_after_delay() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        let _ = controller.select_file(csv_file("bad.txt"));
        let deadline = controller.next_deadline().unwrap();

        controller.tick(deadline - Duration::from_millis(1));
        assert_eq!(controller.status().text, "Please select a CSV file");

        controller.tick(deadline);
        assert_eq!(controller.status().text, IDLE_STATUS);
        assert_eq!(controller.status().kind, StatusKind::Info);
        assert!(controller.next_deadline().is_none());
    }

    #[tokio::test]
    async fn test_upload_without_selection_is_rejected() {
        let store = FakeStore::ok();
        let mut controller = UploadController::new(store, MemoryHistoryStore::new());

        let err = controller.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(ValidationError::NoFileSelected)));
        assert_eq!(controller.status().text, "Please select a file first");
        assert!(controller.store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_success_records_history_and_resets_later() {
        let history_store = MemoryHistoryStore::new();
        let mut controller = UploadController::new(FakeStore::ok(), history_store.clone());
        controller.select_file(csv_file("data.csv")).unwrap();

        let outcome = controller.upload().await.unwrap();
        assert!(outcome.key.starts_with("uploads/"));
        assert!(outcome.key.ends_with("-data.csv"));

        assert_eq!(controller.state(), UploadState::Succeeded);
        assert_eq!(controller.status().text, SUCCESS_STATUS);
        assert_eq!(controller.progress_percent(), 100);
        assert!(!controller.is_upload_enabled());

        let latest = controller.history().latest().unwrap();
        assert_eq!(latest.file_name, "data.csv");
        assert_eq!(latest.file_url, outcome.location);
        assert_eq!(history_store.snapshot().len(), 1);

        // Selection survives until the reset delay passes
        assert!(controller.selected_file().is_some());
        controller.tick(Instant::now() + MESSAGE_DURATION);
        assert!(controller.selected_file().is_none());
        assert_eq!(controller.state(), UploadState::Idle);
        assert_eq!(controller.status().text, READY_STATUS);
        assert_eq!(controller.progress_percent(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejected_until_form_resets() {
        let history_store = MemoryHistoryStore::new();
        let mut controller = UploadController::new(FakeStore::ok(), history_store.clone());
        controller.select_file(csv_file("data.csv")).unwrap();
        controller.upload().await.unwrap();

        let err = controller.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(ValidationError::UploadDisabled)));
        assert_eq!(controller.store.requests.lock().unwrap().len(), 1);
        assert_eq!(controller.history().len(), 1);
        assert_eq!(history_store.snapshot().len(), 1);
        assert_eq!(controller.state(), UploadState::Succeeded);
        assert_eq!(controller.status().text, SUCCESS_STATUS);

        // Selecting again re-enables the control
        controller.select_file(csv_file("data.csv")).unwrap();
        controller.upload().await.unwrap();
        assert_eq!(controller.store.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_sends_csv_content_type() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        controller.select_file(csv_file("data.csv")).unwrap();
        controller.upload().await.unwrap();

        let requests = controller.store.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content_type, "text/csv");
        assert_eq!(&requests[0].body[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_upload_failure_allows_retry() {
        let history_store = MemoryHistoryStore::new();
        let mut controller =
            UploadController::new(FakeStore::failing("network error"), history_store.clone());
        controller.select_file(csv_file("data.csv")).unwrap();

        let err = controller.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::Transfer(_)));
        assert_eq!(controller.state(), UploadState::Failed);
        assert_eq!(controller.status().text, "Upload failed: network error");
        assert_eq!(controller.status().kind, StatusKind::Error);
        assert!(controller.is_upload_enabled());
        assert!(controller.selected_file().is_some());
        assert!(controller.history().is_empty());
        assert!(history_store.snapshot().is_empty());

        // Failure messages stay until the next action
        assert!(controller.next_deadline().is_none());
    }

    #[tokio::test]
    async fn test_progress_reaches_subscribers() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        let mut rx = controller.subscribe_progress();
        controller.select_file(csv_file("data.csv")).unwrap();
        controller.upload().await.unwrap();

        assert!(rx.has_changed().unwrap());
        let last = *rx.borrow_and_update();
        assert_eq!(last, UploadProgress::complete(8));
    }

    #[tokio::test]
    async fn test_same_millisecond_uploads_get_distinct_keys() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());

        controller.select_file(csv_file("data.csv")).unwrap();
        let first = controller.upload().await.unwrap();
        controller.select_file(csv_file("data.csv")).unwrap();
        let second = controller.upload().await.unwrap();

        assert_ne!(first.key, second.key);
    }

    #[tokio::test]
    async fn test_new_selection_cancels_pending_reset() {
        let mut controller = UploadController::new(FakeStore::ok(), MemoryHistoryStore::new());
        controller.select_file(csv_file("first.csv")).unwrap();
        controller.upload().await.unwrap();

        controller.select_file(csv_file("second.csv")).unwrap();
        assert_eq!(controller.status().text, READY_STATUS);

        controller.tick(Instant::now() + MESSAGE_DURATION * 2);
        assert_eq!(controller.selected_file().unwrap().name, "second.csv");
        assert!(controller.is_upload_enabled());
    }

    #[tokio::test]
    async fn test_history_loaded_from_store() {
        let mut existing = UploadHistory::new();
        existing.push(HistoryEntry::new("old.csv", "https://bucket/old.csv", Utc::now()));
        let store = MemoryHistoryStore::with_history(existing);

        let mut controller = UploadController::new(FakeStore::ok(), store.clone());
        assert_eq!(controller.history().len(), 1);

        controller.clear_history().unwrap();
        assert!(controller.history().is_empty());
        assert!(store.snapshot().is_empty());
    }
}
