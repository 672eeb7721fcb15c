// ==============================================================================
// config.rs - Annotation Run Configuration
// ==============================================================================
// Description: Tunables for chunking, remote fields and fetch hardening
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-16
// Version: 1.2.1
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::source::DEFAULT_ENDPOINT;

/// Default number of identifiers submitted per remote request
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of batches allowed in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Remote field paths requested for every variant
pub const DEFAULT_FIELDS: &[&str] = &[
    // frequency
    "cadd.1000g.af",
    "dbnsfp.1000gp3.af",
    "gnomad_exome.af.af_male",
    "gnomad_exome.af.af",
    "gnomad_exome.af.af_female",
    "dbnsfp.exac.af",
    "dbsnp.alleles.freq.exac",
    "exac.af",
    // gene id
    "dbnsfp.ensembl.geneid",
    "docm.ensembl_gene_id",
    "cadd.gene.gene_id",
    // rsid
    "dbsnp.rsid",
    "dbnsfp.rsid",
    "gnomad_genome.rsid",
    // depth
    "gnomad_exome.dp",
    "gnomad_genome.dp",
    "exac.dp",
    // vcf
    "vcf",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid chunk size: {0} (must be > 0)")]
    InvalidChunkSize(usize),

    #[error("Field list is empty")]
    EmptyFields,

    #[error("Invalid field path: '{0}'")]
    InvalidField(String),

    #[error("Invalid concurrency limit: {0} (must be > 0)")]
    InvalidConcurrency(usize),

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Invalid annotation endpoint: '{0}'")]
    InvalidEndpoint(String),
}

/// What to do when a batch still fails after its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the whole run and discard completed batches
    #[default]
    FailFast,
    /// Skip the failed batch, report it, keep the rest
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Base URL of the annotation service
    pub endpoint: String,
    pub chunk_size: usize,
    pub fields: Vec<String>,
    pub max_concurrency: usize,
    /// Applied to each remote call attempt
    pub batch_timeout: Option<Duration>,
    /// Extra attempts per batch after the first failure
    pub max_retries: u32,
    /// Linear backoff unit: attempt `n` waits `n * retry_backoff`
    pub retry_backoff: Duration,
    pub failure_mode: FailureMode,
    /// Skip calls that cannot be converted instead of aborting the run
    pub skip_invalid_calls: bool,
    /// Wraps the entire fan-out/fan-in unit
    pub run_timeout: Option<Duration>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            batch_timeout: Some(Duration::from_secs(60)),
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            failure_mode: FailureMode::FailFast,
            skip_invalid_calls: false,
            run_timeout: None,
        }
    }
}

impl AnnotatorConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.max_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn with_skip_invalid_calls(mut self, skip: bool) -> Self {
        self.skip_invalid_calls = skip;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Reject settings that could never produce a valid run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        validate_fields(&self.fields)?;

        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrency));
        }

        if self.batch_timeout.is_some_and(|t| t.is_zero())
            || self.run_timeout.is_some_and(|t| t.is_zero())
        {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

/// Reject an empty field list or any malformed field path
pub fn validate_fields(fields: &[String]) -> Result<(), ConfigError> {
    if fields.is_empty() {
        return Err(ConfigError::EmptyFields);
    }

    match fields.iter().find(|f| !is_valid_field(f)) {
        Some(bad) => Err(ConfigError::InvalidField(bad.clone())),
        None => Ok(()),
    }
}

/// Dotted path of non-empty segments without separators the remote API splits on
fn is_valid_field(field: &str) -> bool {
    !field.is_empty()
        && !field.contains(&[',', ' ', '\t'][..])
        && field.split('.').all(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnnotatorConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.fields.len(), DEFAULT_FIELDS.len());
        assert_eq!(config.failure_mode, FailureMode::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let base = AnnotatorConfig::default();

        assert_eq!(
            base.clone().with_chunk_size(0).validate(),
            Err(ConfigError::InvalidChunkSize(0))
        );
        assert_eq!(
            base.clone().with_fields(Vec::<String>::new()).validate(),
            Err(ConfigError::EmptyFields)
        );
        assert_eq!(
            base.clone().with_fields(["dbsnp.rsid", "gnomad..af"]).validate(),
            Err(ConfigError::InvalidField("gnomad..af".to_string()))
        );
        assert_eq!(
            base.clone().with_fields(["dbsnp.rsid,exac.af"]).validate(),
            Err(ConfigError::InvalidField("dbsnp.rsid,exac.af".to_string()))
        );
        assert_eq!(
            base.clone().with_max_concurrency(0).validate(),
            Err(ConfigError::InvalidConcurrency(0))
        );
        assert_eq!(
            base.clone().with_batch_timeout(Some(Duration::ZERO)).validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            base.clone().with_endpoint("").validate(),
            Err(ConfigError::InvalidEndpoint(String::new()))
        );
        assert_eq!(
            base.with_endpoint("myvariant.info/v1").validate(),
            Err(ConfigError::InvalidEndpoint("myvariant.info/v1".to_string()))
        );
    }

    #[test]
    fn test_failure_mode_serde() {
        let json = serde_json::to_string(&FailureMode::FailFast).unwrap();
        assert_eq!(json, "\"fail_fast\"");

        let parsed: FailureMode = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(parsed, FailureMode::Partial);
    }
}
