//! Terminal rendering for the upload form

use csv_uploader::controller::{StatusKind, UploadController};
use csv_uploader::file::{FileDetails, SelectedFile};
use csv_uploader::history::HistoryStore;
use csv_uploader::preview::CsvPreview;
use csv_uploader::upload::{ObjectStore, UploadError, UploadOutcome};
use indicatif::{ProgressBar, ProgressStyle};

/// Rows shown under the file details
pub const DETAIL_PREVIEW_ROWS: usize = 5;

pub fn print_details(details: &FileDetails) {
    println!("File: {}", details.name);
    println!("Size: {} MB", details.size_mb);
    println!("Last Modified: {}", details.last_modified);
}

pub fn print_preview(data: &[u8], rows: usize) {
    match CsvPreview::from_bytes(data, rows) {
        Ok(preview) => {
            println!("Contents: {}", preview.summary());
            for line in preview.render_lines() {
                println!("  {}", line);
            }
        }
        Err(e) => tracing::warn!("Cannot preview file: {:#}", e),
    }
}

/// Preview shown with the file details; skipped when the file can't be read
pub async fn print_file_preview(file: &SelectedFile, rows: usize) {
    match file.read().await {
        Ok(data) => print_preview(&data, rows),
        Err(e) => tracing::warn!("Cannot read {} for preview: {}", file.name, e),
    }
}

pub fn print_status<S: ObjectStore, H: HistoryStore>(controller: &UploadController<S, H>) {
    let status = controller.status();
    match status.kind {
        StatusKind::Error => eprintln!("! {}", status.text),
        StatusKind::Success => println!("✓ {}", status.text),
        StatusKind::Info => println!("{}", status.text),
    }
}

pub fn print_history(lines: &[String]) {
    println!("Upload history:");
    for line in lines {
        println!("  {}", line);
    }
}

/// Run the controller's upload with a progress bar attached
pub async fn upload_with_progress<S: ObjectStore, H: HistoryStore>(
    controller: &mut UploadController<S, H>,
) -> Result<UploadOutcome, UploadError> {
    if !controller.is_upload_enabled() {
        return controller.upload().await;
    }

    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(controller.status().text.clone());

    let mut rx = controller.subscribe_progress();
    let watcher = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let progress = *rx.borrow_and_update();
                bar.set_position(u64::from(progress.percentage()));
                bar.set_message(progress.status_text());
            }
        })
    };

    let result = controller.upload().await;
    watcher.abort();

    bar.set_position(u64::from(controller.progress_percent()));
    match &result {
        Ok(_) => bar.finish_with_message(controller.status().text.clone()),
        Err(_) => bar.abandon_with_message(controller.status().text.clone()),
    }

    result
}

/// Human-readable upload destination
pub fn describe_target(bucket: &str, region: &str) -> String {
    format!("s3://{} ({})", bucket, region)
}

pub fn print_error(message: impl std::fmt::Display) {
    eprintln!("! {}", message);
}
