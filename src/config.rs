//! Uploader configuration
//!
//! Stored in the platform-specific config folder:
//! - Linux: ~/.config/csv-uploader/config.json
//! - Windows: %APPDATA%/csv-uploader/config/config.json
//! - macOS: ~/Library/Application Support/org.csv-uploader.csv-uploader/config.json
//!
//! Command line flags and environment variables override individual fields
//! through [`ConfigOverrides`].

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Storage target and credential source, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub bucket_name: String,

    /// Cognito identity pool used for credential exchange. When empty the
    /// default AWS credential chain is used instead.
    #[serde(default)]
    pub identity_pool_id: String,

    /// Optional API gateway base URL, kept for tooling that talks to it
    #[serde(default)]
    pub api_url: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,

    /// Named AWS profile, only consulted without an identity pool
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket_name: String::new(),
            identity_pool_id: String::new(),
            api_url: None,
            endpoint_url: None,
            force_path_style: false,
            profile: None,
        }
    }
}

/// Field overrides collected from the command line and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub region: Option<String>,
    pub bucket_name: Option<String>,
    pub identity_pool_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub profile: Option<String>,
}

impl UploaderConfig {
    /// Load config from the default location, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: UploaderConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        tracing::info!(
            "Loaded config: region={}, bucket={}, identity_pool_set={}",
            config.region,
            config.bucket_name,
            config.has_identity_pool()
        );

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::debug!("Saved config to {:?}", path);

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }

    /// Apply overrides, keeping the loaded value for every field left unset
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(region) = overrides.region {
            self.region = region;
        }
        if let Some(bucket) = overrides.bucket_name {
            self.bucket_name = bucket;
        }
        if let Some(pool) = overrides.identity_pool_id {
            self.identity_pool_id = pool;
        }
        if let Some(endpoint) = overrides.endpoint_url {
            self.endpoint_url = Some(endpoint);
            // S3-compatible stores rarely support virtual-hosted addressing
            self.force_path_style = true;
        }
        if let Some(profile) = overrides.profile {
            self.profile = Some(profile);
        }
    }

    pub fn has_identity_pool(&self) -> bool {
        !self.identity_pool_id.trim().is_empty()
    }
}

/// Project directories shared by the config and history files
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "csv-uploader", "csv-uploader")
        .context("Failed to determine application directories")
}
