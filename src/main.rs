use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use brand_facet_extractor::config::{LogFormat, LoggingConfig};
use brand_facet_extractor::export::{default_file_name, render_table, write_csv};
use brand_facet_extractor::models::Severity;
use brand_facet_extractor::source::{classify_input, DocumentSource, FileSource, Input, UrlSource};
use brand_facet_extractor::utils::http::{create_client, RetryPolicy};
use brand_facet_extractor::{Config, ExtractError, Outcome, Pipeline, Site};

/// Bytes of a saved page searched for the store name when the file name has none.
const SITE_SNIFF_LEN: usize = 16 * 1024;

#[derive(Debug, Parser)]
#[command(name = "brand-facet-extractor")]
#[command(about = "Extract the brand filter of a Sephora or Level Shoes listing page into CSV")]
struct Cli {
    /// Listing page URL or saved .html file. Prompted for when omitted.
    input: Option<String>,

    /// CSV output path. Defaults to <site>_brands_<timestamp>.csv.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file.
    #[arg(short, long, env = "FACET_EXTRACTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    let raw = match cli.input {
        Some(input) => input,
        None => prompt_for_input().await?,
    };

    let input = match classify_input(&raw, &config) {
        Ok(input) => input,
        Err(e) => {
            let e = ExtractError::from(e);
            report_error(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let source: Box<dyn DocumentSource> = match &input {
        Input::File(path) => Box::new(FileSource::new(path)),
        Input::Url(url) => {
            let client = create_client(&config.http)?;
            Box::new(UrlSource::new(client, url.clone(), RetryPolicy::from_config(&config.http)))
        }
    };
    info!("Loading {}", source.describe());

    let document = match source.load().await {
        Ok(document) => document,
        Err(e) => {
            report_error(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let site = match input.site() {
        Site::Other => {
            let head = &document.bytes[..document.bytes.len().min(SITE_SNIFF_LEN)];
            Site::detect(&String::from_utf8_lossy(head))
        }
        site => site,
    };
    info!("Extracting brands from {} page", site);

    let pipeline = Pipeline::new(&config.extraction);
    let result = match pipeline.run(&document) {
        Ok(result) => result,
        Err(e) => {
            report_error(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    for diagnostic in &result.diagnostics {
        match diagnostic.severity() {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
        }
        if let Some(hint) = diagnostic.remediation() {
            warn!("{}", hint);
        }
    }

    match result.outcome {
        Outcome::Done { table, strategy } => {
            info!("Brand facet found by {} strategy", strategy);
            print!("{}", render_table(&table, &config.export));

            let path = cli
                .output
                .unwrap_or_else(|| default_file_name(site, &Local::now()));
            write_csv(&table, &config.export, &path)
                .await
                .with_context(|| format!("Failed to export {}", path.display()))?;
            println!("Saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed => {
            error!("Brand list could not be extracted from {}", source.describe());
            Ok(ExitCode::from(2))
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn prompt_for_input() -> Result<String> {
    eprint!("Sephora or Level Shoes URL, or saved .html file: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read input from stdin")?;
    Ok(line.trim().to_string())
}

fn report_error(e: &ExtractError) {
    error!("{}", e);
    if let Some(hint) = e.remediation() {
        warn!("{}", hint);
    }
}
