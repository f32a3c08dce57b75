use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use pgscribe::config;
use pgscribe::db;
use pgscribe::exporter::Exporter;
use pgscribe::extractor::Extractor;
use pgscribe::source::psql::PsqlSource;
use pgscribe::source::query::QuerySource;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "pgscribe.yaml", global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct ExtractArgs {
    /// Run catalog access through the psql command-line client instead of a
    /// direct connection
    #[arg(long)]
    psql: bool,

    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(flatten)]
    export_args: config::ExportArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract schema DDL from a database into one SQL file per object
    Extract(ExtractArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    run(cli).await
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract(args) => {
            let file_config = config::load_config(&cli.config_file)?;
            let cli_config = config::ConfigInput {
                database: Some(args.database_args.clone().into()),
                export: Some(args.export_args.clone().into()),
            };

            let config = config::ConfigBuilder::new()
                .with_file(file_config)
                .with_cli_args(cli_config)
                .resolve()?;

            let extractor = if args.psql {
                info!("Using the psql client backend");
                Extractor::new(Box::new(PsqlSource::new(config.database.clone())))
            } else {
                let pool = db::connect(&config.database).await?;
                Extractor::new(Box::new(QuerySource::new(pool)))
            };

            let schemas = extractor.extract_schemas(&config.export.schemas).await?;

            let exporter = Exporter::new(config.export.output_dir.clone());
            exporter.export(&schemas)?;

            println!(
                "Exported {} schema(s) to {}",
                schemas.len(),
                config.export.output_dir.display()
            );
            Ok(())
        }
    }
}
