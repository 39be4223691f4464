//! Interactive upload session
//!
//! Reads commands from stdin. A bare path selects that file, the same way a
//! drop onto the upload area would.

use anyhow::Result;
use csv_uploader::controller::UploadController;
use csv_uploader::file::SelectedFile;
use csv_uploader::history::HistoryStore;
use csv_uploader::upload::{ObjectStore, UploadError, ValidationError};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::ui;

const HELP: &str = "\
Commands:
  select <path>   choose a CSV file (a bare path works too)
  upload          upload the selected file
  status          show the current status and selection
  history         list recent uploads
  clear-history   remove every history entry
  help            show this help
  quit            leave the session";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Select(PathBuf),
    Upload,
    Status,
    History,
    ClearHistory,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => Command::Empty,
        "select" | "drop" if !rest.is_empty() => Command::Select(PathBuf::from(unquote(rest))),
        "upload" => Command::Upload,
        "status" => Command::Status,
        "history" => Command::History,
        "clear-history" => Command::ClearHistory,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ if looks_like_path(line) => Command::Select(PathBuf::from(unquote(line))),
        _ => Command::Unknown(word.to_string()),
    }
}

/// Terminals quote dropped paths that contain spaces
fn unquote(s: &str) -> &str {
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(s)
}

fn looks_like_path(s: &str) -> bool {
    let s = unquote(s);
    s.contains('/') || s.contains('\\') || s.contains('.')
}

pub async fn run<S: ObjectStore, H: HistoryStore>(
    controller: &mut UploadController<S, H>,
) -> Result<()> {
    println!("{}", HELP);
    ui::print_status(controller);
    ui::print_history(&controller.history_lines());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = controller.next_deadline();
        let sleep = tokio::time::sleep_until(
            deadline
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(tokio::time::Instant::now),
        );

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = sleep, if deadline.is_some() => {
                controller.tick(Instant::now());
                ui::print_status(controller);
                continue;
            }
        };

        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Command::Select(path) => match SelectedFile::from_path(&path).await {
                Ok(file) => match controller.select_file(file) {
                    Ok(details) => {
                        ui::print_details(&details);
                        if let Some(file) = controller.selected_file() {
                            ui::print_file_preview(file, ui::DETAIL_PREVIEW_ROWS).await;
                        }
                    }
                    Err(_) => ui::print_status(controller),
                },
                Err(e) => ui::print_error(format!("Cannot open {}: {}", path.display(), e)),
            },
            Command::Upload => match ui::upload_with_progress(controller).await {
                Ok(_) => {
                    ui::print_status(controller);
                    ui::print_history(&controller.history_lines());
                }
                Err(UploadError::Validation(err @ ValidationError::UploadDisabled)) => {
                    ui::print_error(err)
                }
                Err(_) => ui::print_status(controller),
            },
            Command::Status => {
                ui::print_status(controller);
                match controller.file_details() {
                    Some(details) => ui::print_details(&details),
                    None => println!("No file selected"),
                }
            }
            Command::History => ui::print_history(&controller.history_lines()),
            Command::ClearHistory => {
                if let Err(e) = controller.clear_history() {
                    ui::print_error(format!("{:#}", e));
                }
                ui::print_history(&controller.history_lines());
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Empty => {}
            Command::Unknown(word) => {
                ui::print_error(format!("Unknown command: {} (try `help`)", word))
            }
        }
    }

    Ok(())
}
