use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{
    Config, ConfigInput, DEFAULT_HOST, DEFAULT_OUTPUT_DIR, DEFAULT_PORT, DEFAULT_SCHEMA, Database,
    Export,
};

/// Merge configuration layers into a resolved [`Config`]. CLI arguments win
/// over the file, the file wins over defaults.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: ConfigInput,
    cli: ConfigInput,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, input: ConfigInput) -> Self {
        self.file = input;
        self
    }

    pub fn with_cli_args(mut self, input: ConfigInput) -> Self {
        self.cli = input;
        self
    }

    pub fn resolve(self) -> Result<Config> {
        let db_file = self.file.database.unwrap_or_default();
        let db_cli = self.cli.database.unwrap_or_default();
        let export_file = self.file.export.unwrap_or_default();
        let export_cli = self.cli.export.unwrap_or_default();

        let database = Database {
            host: db_cli
                .host
                .or(db_file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: db_cli.port.or(db_file.port).unwrap_or(DEFAULT_PORT),
            user: db_cli
                .user
                .or(db_file.user)
                .context("database user must be set (--user or the config file)")?,
            dbname: db_cli
                .dbname
                .or(db_file.dbname)
                .context("database name must be set (--dbname or the config file)")?,
            password: std::env::var("PGPASSWORD").ok(),
        };

        let export = Export {
            output_dir: export_cli
                .output_dir
                .or(export_file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            schemas: export_cli
                .schemas
                .or(export_file.schemas)
                .unwrap_or_else(|| vec![DEFAULT_SCHEMA.to_string()]),
        };

        Ok(Config { database, export })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseInput, ExportInput};

    fn file_input() -> ConfigInput {
        ConfigInput {
            database: Some(DatabaseInput {
                host: Some("db.internal".to_string()),
                port: Some(5433),
                user: Some("file_user".to_string()),
                dbname: Some("file_db".to_string()),
            }),
            export: Some(ExportInput {
                output_dir: Some(PathBuf::from("file_out")),
                schemas: Some(vec!["billing".to_string()]),
            }),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let cli = ConfigInput {
            database: Some(DatabaseInput {
                user: Some("app".to_string()),
                dbname: Some("appdb".to_string()),
                ..Default::default()
            }),
            export: None,
        };

        let config = ConfigBuilder::new().with_cli_args(cli).resolve().unwrap();

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.export.output_dir, PathBuf::from("./schemas"));
        assert_eq!(config.export.schemas, vec!["public".to_string()]);
    }

    #[test]
    fn test_cli_wins_over_file() {
        let cli = ConfigInput {
            database: Some(DatabaseInput {
                host: Some("cli.internal".to_string()),
                user: Some("cli_user".to_string()),
                ..Default::default()
            }),
            export: Some(ExportInput {
                schemas: Some(vec!["app".to_string(), "audit".to_string()]),
                ..Default::default()
            }),
        };

        let config = ConfigBuilder::new()
            .with_file(file_input())
            .with_cli_args(cli)
            .resolve()
            .unwrap();

        assert_eq!(config.database.host, "cli.internal");
        assert_eq!(config.database.user, "cli_user");
        // Unset on the CLI, so the file layer supplies these
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.dbname, "file_db");
        assert_eq!(config.export.output_dir, PathBuf::from("file_out"));
        assert_eq!(
            config.export.schemas,
            vec!["app".to_string(), "audit".to_string()]
        );
    }

    #[test]
    fn test_file_alone_resolves() {
        let config = ConfigBuilder::new().with_file(file_input()).resolve().unwrap();
        assert_eq!(config.database.user, "file_user");
        assert_eq!(config.export.schemas, vec!["billing".to_string()]);
    }

    #[test]
    fn test_missing_dbname_is_an_error() {
        let cli = ConfigInput {
            database: Some(DatabaseInput {
                user: Some("app".to_string()),
                ..Default::default()
            }),
            export: None,
        };

        let err = ConfigBuilder::new().with_cli_args(cli).resolve().unwrap_err();
        assert!(err.to_string().contains("database name"));
    }
}
