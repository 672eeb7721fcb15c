// ==============================================================================
// error.rs - Annotation Run Errors
// ==============================================================================
// Description: Top-level error taxonomy for an annotation run
// Author: Matt Barham
// Created: 2026-10-06
// Modified: 2026-10-13
// Version: 1.0.0
// ==============================================================================

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetcher::FetchError;
use crate::output::OutputError;
use crate::parsers::VcfParseError;
use crate::validator::ValidationError;
use crate::variant_id::ConversionError;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Cannot convert call #{index} ({call}): {source}")]
    Conversion {
        index: usize,
        call: String,
        #[source]
        source: ConversionError,
    },

    #[error("Annotation fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid input file: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to read variant calls: {0}")]
    Input(#[from] VcfParseError),

    #[error("Failed to write results: {0}")]
    Output(#[from] OutputError),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
