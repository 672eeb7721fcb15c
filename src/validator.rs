// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Pre-flight checks on the input VCF (size, type, format)
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-14
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GiB

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    #[error("Input is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid file type: {0} (expected .vcf, .vcf.gz or .vcf.bgz)")]
    InvalidExtension(String),

    #[error("Magic number mismatch: {0} is not gzip-compressed")]
    NotCompressed(String),

    #[error("Invalid VCF format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input container recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Plain,
    Compressed,
}

#[derive(Debug)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub kind: InputKind,
    pub size: u64,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct InputValidator {
    max_file_size: u64,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedInput, ValidationError> {
        info!("Validating input: {}", file_path.display());

        // 1. Existence and size
        let metadata = std::fs::metadata(file_path)
            .map_err(|_| ValidationError::NotFound(file_path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(ValidationError::NotAFile(file_path.to_path_buf()));
        }

        let size = metadata.len();
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = input_kind(&file_name)
            .ok_or_else(|| ValidationError::InvalidExtension(file_name.clone()))?;
        debug!("Extension check passed: {:?}", kind);

        // 3. Magic number verification
        if kind == InputKind::Compressed {
            let mut magic = [0u8; 3];
            let mut file = File::open(file_path)?;
            if file.read_exact(&mut magic).is_err() || magic != GZIP_MAGIC {
                return Err(ValidationError::NotCompressed(file_name));
            }
            debug!("Magic number check passed");
        }

        // 4. Content validation (fileformat header)
        let first_line = first_line(file_path, kind)?;
        if !first_line.starts_with("##fileformat=VCFv4.") {
            return Err(ValidationError::InvalidFormat(
                "missing ##fileformat=VCFv4.x header".to_string(),
            ));
        }
        debug!("Content validation passed");

        Ok(ValidatedInput {
            path: file_path.to_path_buf(),
            kind,
            size,
            validated_at: chrono::Utc::now(),
        })
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn input_kind(file_name: &str) -> Option<InputKind> {
    if file_name.ends_with(".vcf.gz") || file_name.ends_with(".vcf.bgz") {
        Some(InputKind::Compressed)
    } else if file_name.ends_with(".vcf") {
        Some(InputKind::Plain)
    } else {
        None
    }
}

fn first_line(path: &Path, kind: InputKind) -> Result<String, ValidationError> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = match kind {
        // bgzip output is multi-member gzip
        InputKind::Compressed => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file))),
        InputKind::Plain => Box::new(BufReader::new(file)),
    };

    reader
        .lines()
        .next()
        .ok_or_else(|| ValidationError::InvalidFormat("VCF file is empty".to_string()))?
        .map_err(ValidationError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::Builder;

    const HEADER: &str = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    #[test]
    fn test_input_kind() {
        assert_eq!(input_kind("calls.vcf"), Some(InputKind::Plain));
        assert_eq!(input_kind("calls.vcf.gz"), Some(InputKind::Compressed));
        assert_eq!(input_kind("calls.vcf.bgz"), Some(InputKind::Compressed));
        assert_eq!(input_kind("genome.txt"), None);
        assert_eq!(input_kind("calls.vcf.gz.tbi"), None);
    }

    #[test]
    fn test_validate_plain_vcf() {
        let mut file = Builder::new().suffix(".vcf").tempfile().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.flush().unwrap();

        let validated = InputValidator::new().validate(file.path()).unwrap();
        assert_eq!(validated.kind, InputKind::Plain);
        assert_eq!(validated.size, HEADER.len() as u64);
    }

    #[test]
    fn test_validate_compressed_vcf() {
        let file = Builder::new().suffix(".vcf.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(HEADER.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let validated = InputValidator::new().validate(file.path()).unwrap();
        assert_eq!(validated.kind, InputKind::Compressed);
    }

    #[test]
    fn test_rejects_uncompressed_gz() {
        let mut file = Builder::new().suffix(".vcf.gz").tempfile().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            InputValidator::new().validate(file.path()),
            Err(ValidationError::NotCompressed(_))
        ));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let validator = InputValidator::new();

        assert!(matches!(
            validator.validate(Path::new("/nonexistent/calls.vcf")),
            Err(ValidationError::NotFound(_))
        ));

        let mut txt = Builder::new().suffix(".txt").tempfile().unwrap();
        txt.write_all(HEADER.as_bytes()).unwrap();
        assert!(matches!(
            validator.validate(txt.path()),
            Err(ValidationError::InvalidExtension(_))
        ));

        let mut not_vcf = Builder::new().suffix(".vcf").tempfile().unwrap();
        not_vcf.write_all(b"rsid\tchromosome\tposition\tgenotype\n").unwrap();
        not_vcf.flush().unwrap();
        assert!(matches!(
            validator.validate(not_vcf.path()),
            Err(ValidationError::InvalidFormat(_))
        ));

        let mut large = Builder::new().suffix(".vcf").tempfile().unwrap();
        large.write_all(HEADER.as_bytes()).unwrap();
        large.flush().unwrap();
        assert!(matches!(
            InputValidator::new().with_max_file_size(4).validate(large.path()),
            Err(ValidationError::TooLarge { max: 4, .. })
        ));
    }
}
