//! PageRush CLI
//!
//! Extracts plain text from PDF, DOCX, Markdown and text files.

mod commands;
mod config;
mod output;
mod telemetry;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::CliConfig;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "pagerush",
    author = "PageRush Team",
    version,
    about = "PageRush - extract text from study documents",
    long_about = "Extract plain text from PDF, DOCX, Markdown and text files.\n\n\
                  Files are validated, deduplicated and processed one at a time;\n\
                  a failure in one file never stops the rest of the batch."
)]
struct Cli {
    /// Output format (text, json, yaml)
    #[arg(short, long, value_parser = ["text", "json", "yaml"])]
    format: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "PAGERUSH_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from one or more files
    Extract {
        /// Files to extract
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write one `<name>_extracted.txt` per successful file into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write every successful extraction into a single dated file
        #[arg(short, long)]
        combined: bool,

        /// File results into the document library and search their content
        #[arg(short, long)]
        search: Option<String>,

        /// Owner id used when filing documents
        #[arg(long)]
        owner: Option<String>,

        /// Per-file extraction timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Show the detected format of each file
    Classify {
        /// Files to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List supported formats
    Formats,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = telemetry::init_telemetry(&cli.log_level, cli.json_logs) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    let result = run(cli.command, cli.format.as_deref()).await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            if cli.verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("{}: {}", "Caused by".yellow(), cause);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, format: Option<&str>) -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    let format: OutputFormat = format
        .or(config.output_format.as_deref())
        .unwrap_or("text")
        .parse()
        .map_err(anyhow::Error::msg)?;

    match command {
        Commands::Extract {
            paths,
            output_dir,
            combined,
            search,
            owner,
            timeout,
        } => {
            let options = commands::extract::ExtractOptions {
                output_dir: output_dir.or(config.output_dir.clone()),
                combined,
                search,
                owner: owner
                    .or(config.owner.clone())
                    .unwrap_or_else(|| "local".to_string()),
                timeout_secs: timeout.or(config.file_timeout_secs),
            };
            commands::extract::run(&paths, options, format).await
        }
        Commands::Classify { paths } => commands::classify::run(&paths, format).await,
        Commands::Formats => commands::formats::run(format),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}
