//! CSV Uploader
//!
//! Terminal tool that uploads CSV files directly to an S3 bucket using
//! Cognito identity pool credentials, and keeps a short local upload history.

mod cli;
mod shell;
mod ui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction, TargetArgs};
use csv_uploader::config::UploaderConfig;
use csv_uploader::controller::UploadController;
use csv_uploader::file::SelectedFile;
use csv_uploader::history::{HistoryStore, JsonFileHistoryStore};
use csv_uploader::s3::{CredentialSource, S3BucketStore, S3Client};
use csv_uploader::sample;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csv_uploader=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting csv-uploader v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Upload { file, preview } => upload(&cli.target, &file, preview).await,
        Commands::Shell => interactive(&cli.target).await,
        Commands::Preview { file, rows } => preview_file(&file, rows).await,
        Commands::History { clear } => history(clear),
        Commands::Config { action } => config(&cli.target, action),
        Commands::GenerateSample { users, output_dir } => {
            let path = sample::generate_user_data(users, &output_dir)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load_config(target: &TargetArgs) -> Result<UploaderConfig> {
    let mut config = match &target.config {
        Some(path) => UploaderConfig::load_from(path)?,
        None => UploaderConfig::load()?,
    };
    config.apply(target.overrides());
    Ok(config)
}

fn ensure_bucket(config: &UploaderConfig) -> Result<()> {
    if config.bucket_name.trim().is_empty() {
        bail!("No bucket configured; pass --bucket or run `config init --bucket <name>`");
    }
    Ok(())
}

async fn controller(
    target: &TargetArgs,
) -> Result<UploadController<S3BucketStore, JsonFileHistoryStore>> {
    let config = load_config(target)?;
    ensure_bucket(&config)?;

    let client = S3Client::new(&config).await?;
    tracing::info!(
        "Uploading to {}",
        ui::describe_target(&config.bucket_name, client.region())
    );

    let store = S3BucketStore::new(client, &config.bucket_name);
    Ok(UploadController::new(store, JsonFileHistoryStore::default_location()?))
}

async fn upload(target: &TargetArgs, path: &Path, preview: bool) -> Result<()> {
    let mut controller = controller(target).await?;

    let file = SelectedFile::from_path(path)
        .await
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let details = controller.select_file(file)?;
    ui::print_details(&details);
    if preview {
        if let Some(file) = controller.selected_file() {
            ui::print_file_preview(file, ui::DETAIL_PREVIEW_ROWS).await;
        }
    }

    let outcome = ui::upload_with_progress(&mut controller).await?;
    println!("{}", outcome.location);
    ui::print_history(&controller.history_lines());
    Ok(())
}

async fn interactive(target: &TargetArgs) -> Result<()> {
    let mut controller = controller(target).await?;
    shell::run(&mut controller).await
}

async fn preview_file(path: &Path, rows: usize) -> Result<()> {
    let file = SelectedFile::from_path(path)
        .await
        .with_context(|| format!("Cannot open {}", path.display()))?;
    ui::print_details(&file.details());
    let data = file
        .read()
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    ui::print_preview(&data, rows);
    Ok(())
}

fn history(clear: bool) -> Result<()> {
    let store = JsonFileHistoryStore::default_location()?;
    let mut history = store.load()?;

    if clear {
        history.clear();
        store.save(&history)?;
        println!("Upload history cleared");
        return Ok(());
    }

    ui::print_history(&history.render_lines());
    if let Some(latest) = history.latest() {
        println!("Latest: {}", latest.file_url);
    }
    Ok(())
}

fn config(target: &TargetArgs, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(target)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!(
                "# credentials: {}",
                CredentialSource::from_config(&config).as_str()
            );
            Ok(())
        }
        ConfigAction::Init { force } => {
            let path = match &target.config {
                Some(path) => path.clone(),
                None => UploaderConfig::config_path()?,
            };
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }

            let mut config = UploaderConfig::default();
            config.apply(target.overrides());
            config.save_to(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
