// ==============================================================================
// models.rs - Variant Annotation Data Models
// ==============================================================================
// Description: Data structures shared by the annotation enrichment pipeline
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-14
// Version: 1.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// One variant call as read from a call-set file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantCall {
    /// Chromosome as written in the file (e.g., "1", "chr1", "X", "MT")
    pub chromosome: String,

    /// 1-based position of the first reference base
    pub position: u64,

    /// Reference allele (e.g., "A")
    pub reference: String,

    /// Alternate allele column; multiple alternates are comma-separated
    pub alternate: String,
}

impl VariantCall {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            reference: reference.into(),
            alternate: alternate.into(),
        }
    }

    /// First alternate allele; the only one used for identifier conversion
    pub fn first_alternate(&self) -> &str {
        self.alternate.split(',').next().unwrap_or("")
    }

    pub fn is_multiallelic(&self) -> bool {
        self.alternate.contains(',')
    }
}

impl fmt::Display for VariantCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chromosome, self.position, self.reference, self.alternate
        )
    }
}

/// Canonical identifier of a variant as understood by the annotation source
/// (e.g., "chr1:g.35367G>A")
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VariantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Contiguous, order-preserving slice of the identifier sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in submission order (0-based)
    pub index: usize,

    /// Identifiers in input order
    pub ids: Vec<VariantId>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Flat per-variant summary derived from one annotation record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedVariant {
    /// Identifier echoed back by the annotation source
    pub query: VariantId,

    /// dbSNP reference SNP id (e.g., "rs12345")
    pub rsid: Option<String>,

    /// Gene identifiers, first-seen order, no duplicates
    pub gene_ids: Vec<String>,

    /// Allele frequency resolved across sources by priority
    pub global_freq: Option<f64>,

    /// Male-stratified allele frequency
    pub male_freq: Option<f64>,

    /// Female-stratified allele frequency
    pub female_freq: Option<f64>,

    /// Sequencing depth resolved across sources by priority
    pub global_dp: Option<u64>,
}
