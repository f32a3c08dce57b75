//! Configuration: an optional YAML file merged with CLI flags.
//!
//! Precedence is CLI over file over defaults. The database password is never
//! part of the configuration surface; it comes from the `PGPASSWORD`
//! environment variable (a `.env` file is honored).

pub mod builder;

pub use builder::ConfigBuilder;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_OUTPUT_DIR: &str = "./schemas";
pub const DEFAULT_SCHEMA: &str = "public";

/// Raw configuration input - all fields optional so the file and CLI layers
/// can merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigInput {
    pub database: Option<DatabaseInput>,
    pub export: Option<ExportInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseInput {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub dbname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportInput {
    pub output_dir: Option<PathBuf>,
    pub schemas: Option<Vec<String>>,
}

/// Resolved configuration with all defaults applied.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: Database,
    pub export: Export,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Export {
    pub output_dir: PathBuf,
    pub schemas: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Database host
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Database port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Database user
    #[arg(long, short = 'U')]
    pub user: Option<String>,

    /// Database name
    #[arg(long, short = 'd')]
    pub dbname: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Output directory for the generated SQL files
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Schemas to extract (comma-separated)
    #[arg(long, short = 's', value_delimiter = ',')]
    pub schemas: Option<Vec<String>>,
}

impl From<DatabaseArgs> for DatabaseInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            user: args.user,
            dbname: args.dbname,
        }
    }
}

impl From<ExportArgs> for ExportInput {
    fn from(args: ExportArgs) -> Self {
        Self {
            output_dir: args.output,
            schemas: args.schemas,
        }
    }
}

/// Load the configuration file if it exists; a missing file is an empty
/// input, not an error.
pub fn load_config(config_file: &str) -> Result<ConfigInput> {
    if !Path::new(config_file).exists() {
        return Ok(ConfigInput::default());
    }

    let contents = std::fs::read_to_string(config_file)
        .with_context(|| format!("reading config file {config_file}"))?;
    serde_yaml::from_str(&contents).with_context(|| format!("parsing config file {config_file}"))
}
