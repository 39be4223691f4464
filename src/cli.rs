use clap::{Args, Parser, Subcommand};
use csv_uploader::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "csv-uploader", version, about = "Upload CSV files straight to an S3 bucket")]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override the config file
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// AWS region
    #[arg(long, env = "CSV_UPLOADER_REGION", global = true)]
    pub region: Option<String>,

    /// Target bucket
    #[arg(long, env = "CSV_UPLOADER_BUCKET", global = true)]
    pub bucket: Option<String>,

    /// Cognito identity pool id
    #[arg(long = "identity-pool", env = "CSV_UPLOADER_IDENTITY_POOL_ID", global = true)]
    pub identity_pool_id: Option<String>,

    /// Endpoint of an S3-compatible store
    #[arg(long, env = "CSV_UPLOADER_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// AWS profile, used when no identity pool is configured
    #[arg(long, env = "CSV_UPLOADER_PROFILE", global = true)]
    pub profile: Option<String>,
}

impl TargetArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            region: self.region.clone(),
            bucket_name: self.bucket.clone(),
            identity_pool_id: self.identity_pool_id.clone(),
            endpoint_url: self.endpoint.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a CSV file
    Upload {
        /// File to upload
        file: PathBuf,

        /// Show the first rows before uploading
        #[arg(long, default_value_t = false)]
        preview: bool,
    },
    /// Interactive session: select files, upload, watch the history
    Shell,
    /// Show the first rows of a CSV file
    Preview {
        file: PathBuf,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value_t = 10)]
        rows: usize,
    },
    /// Show the upload history
    History {
        /// Remove every entry
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate a sample applicant CSV
    GenerateSample {
        /// Number of applicants
        #[arg(long, default_value_t = 50)]
        users: usize,

        /// Directory to write into
        #[arg(long, default_value = "./sample_data")]
        output_dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective config
    Show,
    /// Write a config file with the current settings
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_upload() {
        let cli = Cli::parse_from(["csv-uploader", "upload", "data.csv", "--preview"]);
        match cli.command {
            Commands::Upload { file, preview } => {
                assert_eq!(file, PathBuf::from("data.csv"));
                assert!(preview);
            }
            _ => panic!("Expected upload subcommand"),
        }
    }

    #[test]
    fn test_parse_global_overrides_after_subcommand() {
        let cli = Cli::parse_from([
            "csv-uploader",
            "upload",
            "data.csv",
            "--bucket",
            "user-data",
            "--identity-pool",
            "us-east-1:pool",
        ]);
        let overrides = cli.target.overrides();
        assert_eq!(overrides.bucket_name.as_deref(), Some("user-data"));
        assert_eq!(overrides.identity_pool_id.as_deref(), Some("us-east-1:pool"));
    }

    #[test]
    fn test_parse_preview_rows() {
        let cli = Cli::parse_from(["csv-uploader", "preview", "data.csv", "-n", "3"]);
        match cli.command {
            Commands::Preview { rows, .. } => assert_eq!(rows, 3),
            _ => panic!("Expected preview subcommand"),
        }
    }

    #[test]
    fn test_parse_history_clear() {
        let cli = Cli::parse_from(["csv-uploader", "history", "--clear"]);
        assert!(matches!(cli.command, Commands::History { clear: true }));
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::parse_from(["csv-uploader", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn test_parse_generate_sample_defaults() {
        let cli = Cli::parse_from(["csv-uploader", "generate-sample"]);
        match cli.command {
            Commands::GenerateSample { users, output_dir } => {
                assert_eq!(users, 50);
                assert_eq!(output_dir, PathBuf::from("./sample_data"));
            }
            _ => panic!("Expected generate-sample subcommand"),
        }
    }
}
