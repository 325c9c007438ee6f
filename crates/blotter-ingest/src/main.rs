//! Blotter Ingest - incident feed loader

use anyhow::Result;
use blotter_common::logging::{init_logging, LogConfig, LogLevel};
use blotter_ingest::config::{Config, Overrides};
use blotter_ingest::{pipeline, report};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "blotter-ingest")]
#[command(author, version, about = "Load the incident feed into the warehouse")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed and replace the staging table with it
    Load {
        /// Incident API endpoint
        #[arg(long)]
        api_url: Option<String>,

        /// Fetch timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Warehouse connection string
        #[arg(long)]
        database_url: Option<String>,

        /// Staging table, optionally schema-qualified
        #[arg(long)]
        table: Option<String>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Print aggregate analytics from the fact table
    Report {
        /// Warehouse connection string
        #[arg(long)]
        database_url: Option<String>,

        /// Fact table, optionally schema-qualified
        #[arg(long)]
        table: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("blotter-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let mut config = Config::load();

    match cli.command {
        Command::Load {
            api_url,
            timeout_secs,
            database_url,
            table,
            json,
        } => {
            config.apply(Overrides {
                api_url,
                timeout_secs,
                database_url,
                staging_table: table,
                report_table: None,
            });
            config.validate()?;

            info!(url = %config.fetch.url, table = %config.staging_table, "Starting incident load");
            let run = pipeline::run_load(&config).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            }
        },
        Command::Report {
            database_url,
            table,
        } => {
            config.apply(Overrides {
                database_url,
                report_table: table,
                ..Overrides::default()
            });
            config.validate()?;

            let text = report::run_report(&config).await?;
            print!("{}", text);
        },
    }

    Ok(())
}
