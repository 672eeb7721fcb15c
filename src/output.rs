// ==============================================================================
// output.rs - Multi-Format Output Generation
// ==============================================================================
// Description: Write the annotation result table as TSV, JSON or Parquet
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-15
// Version: 1.1.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

// Apache Arrow/Parquet for columnar data
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;

use crate::aggregator::{ResultTable, TableRow, COLUMNS};
use crate::fetcher::BatchFailure;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

/// Supported result formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated table (matches the classic annotate.tsv layout)
    #[default]
    Tsv,
    /// JSON document with run metadata
    Json,
    /// Apache Parquet (best for data science: Python, R, Spark)
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "text/tab-separated-values",
            OutputFormat::Json => "application/json",
            OutputFormat::Parquet => "application/vnd.apache.parquet",
        }
    }

    /// Infer the format from a file extension, if recognised
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tsv" | "txt" => Some(OutputFormat::Tsv),
            "json" => Some(OutputFormat::Json),
            "parquet" => Some(OutputFormat::Parquet),
            _ => None,
        }
    }
}

/// Run metadata carried by the JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tool_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub row_count: usize,
    pub failed_batches: Vec<BatchFailure>,
}

impl RunMetadata {
    pub fn new(row_count: usize, failed_batches: Vec<BatchFailure>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            input: None,
            row_count,
            failed_batches,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a RunMetadata,
    rows: Vec<TableRow<'a>>,
}

/// Write `table` to `path` in `format`, creating parent directories
pub fn write_table(
    path: &Path,
    format: OutputFormat,
    table: &ResultTable,
    metadata: &RunMetadata,
) -> Result<PathBuf, OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    info!("Generating {:?} output: {:?}", format, path);
    let file = std::fs::File::create(path).map_err(io_err)?;

    match format {
        OutputFormat::Tsv => write_tsv(table, std::io::BufWriter::new(file))?,
        OutputFormat::Json => write_json(table, metadata, std::io::BufWriter::new(file))?,
        OutputFormat::Parquet => write_parquet(table, file)?,
    }

    info!("{:?} output complete: {} rows", format, table.len());
    Ok(path.to_path_buf())
}

/// Tab-separated table; absent values are written as empty fields
pub fn write_tsv<W: Write>(table: &ResultTable, writer: W) -> Result<(), OutputError> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    tsv.write_record(COLUMNS)?;
    for row in table.rows() {
        tsv.serialize(row)?;
    }
    tsv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_json<W: Write>(
    table: &ResultTable,
    metadata: &RunMetadata,
    writer: W,
) -> Result<(), OutputError> {
    let report = JsonReport {
        metadata,
        rows: table.rows().collect(),
    };
    serde_json::to_writer_pretty(writer, &report)?;
    Ok(())
}

pub fn parquet_schema() -> Schema {
    Schema::new(vec![
        Field::new("hgvs", DataType::Utf8, false),
        Field::new("rsid", DataType::Utf8, true),
        Field::new("genes", DataType::Utf8, false),
        Field::new("freq", DataType::Float64, true),
        Field::new("male_freq", DataType::Float64, true),
        Field::new("female_freq", DataType::Float64, true),
        Field::new("dp", DataType::UInt64, true),
    ])
}

/// Columnar output with SNAPPY compression
pub fn write_parquet<W: Write + Send>(table: &ResultTable, writer: W) -> Result<(), OutputError> {
    let schema = Arc::new(parquet_schema());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            table.hgvs.iter().map(String::as_str).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            table.rsid.iter().map(|r| r.as_deref()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            table.genes.iter().map(String::as_str).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(table.freq.clone())),
        Arc::new(Float64Array::from(table.male_freq.clone())),
        Arc::new(Float64Array::from(table.female_freq.clone())),
        Arc::new(UInt64Array::from(table.dp.clone())),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(writer, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
