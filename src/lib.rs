// ==============================================================================
// lib.rs - Variant Annotator Library
// ==============================================================================
// Description: Library interface for the VCF annotation enrichment pipeline
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-15
// Version: 2.0.0
// ==============================================================================

pub mod aggregator;
pub mod annotation;
pub mod chunker;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod models;
pub mod output;
pub mod parsers;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod validator;
pub mod variant_id;

pub use config::AnnotatorConfig;
pub use error::AnnotateError;
pub use pipeline::{AnnotationPipeline, AnnotationReport};
