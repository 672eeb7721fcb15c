// ==============================================================================
// parsers/vcf.rs - VCF file parser
// ==============================================================================
// Description: Reads variant calls (CHROM, POS, REF, ALT) from VCF files using
//              noodles-vcf
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-14
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.3 Spec: https://samtools.github.io/hts-specs/VCFv4.3.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::AlternateBases;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::VariantCall;

/// VCF parsing errors
#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Failed to open VCF file {path}: {message}")]
    Open { path: String, message: String },

    #[error("Failed to read VCF header: {0}")]
    Header(String),

    #[error("Too many unreadable records ({errors} > {max})")]
    TooManyErrors { errors: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single record was not turned into a call
#[derive(Debug)]
enum RecordIssue {
    /// ALT is "." (reference-only site)
    NoAlternate,
    Malformed(String),
}

/// VCF reader with error tolerance settings
pub struct VcfReader {
    /// Maximum number of unreadable records before failing
    pub max_errors: usize,

    /// Records without an alternate allele (last read)
    pub skipped_count: usize,

    /// Unreadable records (last read)
    pub error_count: usize,
}

impl Default for VcfReader {
    fn default() -> Self {
        Self {
            max_errors: 1000,
            skipped_count: 0,
            error_count: 0,
        }
    }
}

impl VcfReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    /// Read every call from a VCF file (.vcf or bgzip-compressed .vcf.gz)
    ///
    /// Calls are returned in file order. Each call keeps the full ALT column
    /// with alternates comma-joined.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Vec<VariantCall>, VcfParseError> {
        let path = path.as_ref();

        let mut reader = vcf::io::reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| VcfParseError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        self.read_calls(&mut reader)
    }

    /// Read every call from an uncompressed VCF stream
    pub fn read_from<R: BufRead>(&mut self, inner: R) -> Result<Vec<VariantCall>, VcfParseError> {
        let mut reader = vcf::io::Reader::new(inner);
        self.read_calls(&mut reader)
    }

    fn read_calls<R: BufRead>(
        &mut self,
        reader: &mut vcf::io::Reader<R>,
    ) -> Result<Vec<VariantCall>, VcfParseError> {
        reader
            .read_header()
            .map_err(|e| VcfParseError::Header(e.to_string()))?;

        let mut calls = Vec::new();
        self.skipped_count = 0;
        self.error_count = 0;

        for (record_num, result) in reader.records().enumerate() {
            let parsed = result
                .map_err(|e| RecordIssue::Malformed(format!("Failed to read record: {}", e)))
                .and_then(|record| to_call(&record));

            match parsed {
                Ok(call) => calls.push(call),
                Err(RecordIssue::NoAlternate) => {
                    debug!("Record {}: no alternate allele, skipping", record_num + 1);
                    self.skipped_count += 1;
                }
                Err(RecordIssue::Malformed(reason)) => {
                    warn!("Record {}: {}", record_num + 1, reason);
                    self.error_count += 1;

                    if self.error_count > self.max_errors {
                        return Err(VcfParseError::TooManyErrors {
                            errors: self.error_count,
                            max: self.max_errors,
                        });
                    }
                }
            }
        }

        Ok(calls)
    }
}

fn to_call(record: &vcf::Record) -> Result<VariantCall, RecordIssue> {
    let chromosome = record.reference_sequence_name();

    let position = match record.variant_start() {
        Some(Ok(pos)) => pos.get() as u64,
        Some(Err(e)) => return Err(RecordIssue::Malformed(format!("Invalid position: {}", e))),
        None => return Err(RecordIssue::Malformed("Missing position".to_string())),
    };

    let reference = record.reference_bases().to_string();

    let alternate_bases = record.alternate_bases();
    if alternate_bases.is_empty() {
        return Err(RecordIssue::NoAlternate);
    }

    let alternates = alternate_bases
        .iter()
        .collect::<std::io::Result<Vec<&str>>>()
        .map_err(|e| RecordIssue::Malformed(format!("Invalid ALT allele: {}", e)))?;

    Ok(VariantCall::new(chromosome, position, reference, alternates.join(",")))
}
