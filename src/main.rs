// ==============================================================================
// main.rs - Variant Annotator Entry Point
// ==============================================================================
// Description: Annotate the variant calls of a VCF file against myvariant.info
//              and write the summary table
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-16
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use variant_annotator::config::{AnnotatorConfig, FailureMode, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY};
use variant_annotator::events::TracingEvents;
use variant_annotator::output::{write_table, OutputFormat, RunMetadata};
use variant_annotator::source::{MyVariantClient, DEFAULT_ENDPOINT};
use variant_annotator::AnnotationPipeline;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input VCF file (.vcf, .vcf.gz or .vcf.bgz)
    input: PathBuf,

    /// Output file for the annotation table
    output: PathBuf,

    /// Output format (default: from output extension, else tsv)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Variant ids per remote request
    #[arg(long, env = "ANNOTATE_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Maximum batches in flight at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, default_value_t = 60)]
    batch_timeout_secs: u64,

    /// Extra attempts for a failed batch
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Keep successful batches when others fail
    #[arg(long)]
    partial: bool,

    /// Skip calls that cannot be converted instead of aborting
    #[arg(long)]
    skip_invalid: bool,

    /// Comma-separated remote field paths (overrides the default list)
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Annotation service base URL
    #[arg(long, env = "MYVARIANT_URL", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Also write debug-level logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> AnnotatorConfig {
        let mut config = AnnotatorConfig::default()
            .with_endpoint(self.endpoint.clone())
            .with_chunk_size(self.chunk_size)
            .with_max_concurrency(self.concurrency)
            .with_batch_timeout(
                (self.batch_timeout_secs > 0).then(|| Duration::from_secs(self.batch_timeout_secs)),
            )
            .with_skip_invalid_calls(self.skip_invalid);

        if self.retries > 0 {
            let backoff = config.retry_backoff;
            config = config.with_retries(self.retries, backoff);
        }
        if self.partial {
            config = config.with_failure_mode(FailureMode::Partial);
        }
        if let Some(fields) = &self.fields {
            config = config.with_fields(fields.iter().map(|f| f.trim()).filter(|f| !f.is_empty()));
        }
        config
    }

    fn output_format(&self) -> OutputFormat {
        self.format
            .or_else(|| OutputFormat::from_path(&self.output))
            .unwrap_or_default()
    }
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let console = fmt::layer().with_writer(std::io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "variant_annotator=info".into()),
    );

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(EnvFilter::new("variant_annotator=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_file.as_ref())?;

    info!("Variant Annotator starting...");

    let config = args.config();
    let format = args.output_format();

    let client = MyVariantClient::new(config.endpoint.clone())
        .context("Failed to create annotation client")?;
    info!("Annotation source: {}", client.endpoint());

    let pipeline = AnnotationPipeline::new(config, Arc::new(client), Arc::new(TracingEvents))
        .context("Invalid annotation settings")?;

    let report = pipeline
        .annotate_file(&args.input)
        .await
        .with_context(|| format!("Annotation of {:?} failed", args.input))?;

    if !report.failures.is_empty() {
        warn!(
            "{} batches failed; their variants are missing from the output",
            report.failures.len()
        );
    }

    let metadata = RunMetadata::new(report.table.len(), report.failures)
        .with_input(args.input.display().to_string());

    let path = write_table(&args.output, format, &report.table, &metadata)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    info!("Done! Wrote {} rows to {:?}", report.table.len(), path);
    Ok(())
}
