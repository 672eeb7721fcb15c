// ==============================================================================
// variant_id.rs - Variant Call to Identifier Conversion
// ==============================================================================
// Description: Converts VCF-style calls to genomic HGVS ids for remote lookup
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-09
// Version: 1.0.0
// ==============================================================================
// Algorithm:
//   Chromosome "chr" prefix is stripped and re-added, alleles upper-cased,
//   and only the first alternate allele is used:
//   - SNV           A>G                       → chr1:g.100A>G
//   - deletion      REF=ATC, ALT=A            → chr1:g.101_102del
//   - insertion     REF=A,   ALT=ATC          → chr1:g.100_101insTC
//   - MNV / complex REF=AC,  ALT=GT           → chr1:g.100_101delinsGT
//   - shared leading base on both sides is trimmed before classifying
// ==============================================================================

use thiserror::Error;

use crate::models::{VariantCall, VariantId};

/// Errors raised for calls whose allele data cannot be expressed as an id
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Empty chromosome name")]
    EmptyChromosome,

    #[error("Invalid position {0} (must be >= 1)")]
    InvalidPosition(u64),

    #[error("Missing {0} allele")]
    MissingAllele(&'static str),

    #[error("Unsupported {kind} allele '{allele}' (expected A, C, G, T or N bases)")]
    InvalidAllele { kind: &'static str, allele: String },

    #[error("Reference and alternate alleles are identical: '{0}'")]
    IdenticalAlleles(String),
}

/// Convert a variant call to the annotation source's identifier
///
/// Pure and deterministic: equal calls always give equal ids. Only the first
/// alternate allele of a multi-allelic call is used.
///
/// # Examples
/// ```
/// use variant_annotator::models::VariantCall;
/// use variant_annotator::variant_id::to_variant_id;
///
/// let call = VariantCall::new("chr1", 35367, "G", "A");
/// assert_eq!(to_variant_id(&call).unwrap().as_str(), "chr1:g.35367G>A");
/// ```
pub fn to_variant_id(call: &VariantCall) -> Result<VariantId, ConversionError> {
    let chromosome = normalize_chromosome(&call.chromosome)?;

    if call.position == 0 {
        return Err(ConversionError::InvalidPosition(call.position));
    }

    let reference = normalize_allele(&call.reference, "reference")?;
    let alternate = normalize_allele(call.first_alternate(), "alternate")?;

    if reference == alternate {
        return Err(ConversionError::IdenticalAlleles(reference));
    }

    Ok(VariantId::new(format_hgvs(
        chromosome,
        call.position,
        &reference,
        &alternate,
    )))
}

/// Convert every call, stopping at the first malformed one
///
/// Returns the index of the failing call alongside the error.
pub fn convert_all(calls: &[VariantCall]) -> Result<Vec<VariantId>, (usize, ConversionError)> {
    calls
        .iter()
        .enumerate()
        .map(|(idx, call)| to_variant_id(call).map_err(|e| (idx, e)))
        .collect()
}

fn normalize_chromosome(chrom: &str) -> Result<&str, ConversionError> {
    let trimmed = chrom.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };

    if stripped.is_empty() {
        return Err(ConversionError::EmptyChromosome);
    }
    Ok(stripped)
}

fn normalize_allele(allele: &str, kind: &'static str) -> Result<String, ConversionError> {
    let allele = allele.trim();
    if allele.is_empty() || allele == "." {
        return Err(ConversionError::MissingAllele(kind));
    }

    let upper = allele.to_ascii_uppercase();
    if !upper.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
        return Err(ConversionError::InvalidAllele {
            kind,
            allele: allele.to_string(),
        });
    }
    Ok(upper)
}

/// Build the HGVS g. expression for already-validated, distinct alleles
fn format_hgvs(chrom: &str, pos: u64, reference: &str, alternate: &str) -> String {
    // Trim a shared leading base while both sides are longer than one base
    let mut pos = pos;
    let mut reference = reference;
    let mut alternate = alternate;
    while reference.len() > 1 && alternate.len() > 1 && reference.as_bytes()[0] == alternate.as_bytes()[0] {
        reference = &reference[1..];
        alternate = &alternate[1..];
        pos += 1;
    }

    let ref_len = reference.len() as u64;
    let ref_first = reference.as_bytes()[0];
    let alt_first = alternate.as_bytes()[0];

    match (reference.len(), alternate.len()) {
        (1, 1) => format!("chr{}:g.{}{}>{}", chrom, pos, reference, alternate),
        (_, 1) if ref_first == alt_first => {
            let start = pos + 1;
            let end = pos + ref_len - 1;
            if start == end {
                format!("chr{}:g.{}del", chrom, start)
            } else {
                format!("chr{}:g.{}_{}del", chrom, start, end)
            }
        }
        (1, _) if ref_first == alt_first => {
            format!("chr{}:g.{}_{}ins{}", chrom, pos, pos + 1, &alternate[1..])
        }
        (1, _) => format!("chr{}:g.{}delins{}", chrom, pos, alternate),
        _ => format!(
            "chr{}:g.{}_{}delins{}",
            chrom,
            pos,
            pos + ref_len - 1,
            alternate
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(chrom: &str, pos: u64, reference: &str, alternate: &str) -> String {
        to_variant_id(&VariantCall::new(chrom, pos, reference, alternate))
            .unwrap()
            .into_inner()
    }

    #[test]
    fn test_snv() {
        assert_eq!(id("1", 35367, "G", "A"), "chr1:g.35367G>A");
        assert_eq!(id("chr1", 35367, "G", "A"), "chr1:g.35367G>A");
        assert_eq!(id("CHRX", 100, "c", "t"), "chrX:g.100C>T");
    }

    #[test]
    fn test_deletion() {
        assert_eq!(id("1", 100, "AT", "A"), "chr1:g.101del");
        assert_eq!(id("1", 100, "ATCG", "A"), "chr1:g.101_103del");
        // Anchor base differs from ALT: whole reference span replaced
        assert_eq!(id("1", 100, "ATC", "G"), "chr1:g.100_102delinsG");
    }

    #[test]
    fn test_insertion() {
        assert_eq!(id("2", 500, "A", "ATC"), "chr2:g.500_501insTC");
        assert_eq!(id("2", 500, "A", "GTC"), "chr2:g.500delinsGTC");
    }

    #[test]
    fn test_complex_with_shared_prefix() {
        // AGC>AT trims the shared A, then GC>T is a delins from 101 to 102
        assert_eq!(id("3", 100, "AGC", "AT"), "chr3:g.101_102delinsT");
        // ACG>ATT trims to CG>TT
        assert_eq!(id("3", 100, "ACG", "ATT"), "chr3:g.101_102delinsTT");
        // AAT>AATCC trims to T>TCC, an insertion after 102
        assert_eq!(id("3", 100, "AAT", "AATCC"), "chr3:g.102_103insCC");
    }

    #[test]
    fn test_mnv() {
        assert_eq!(id("5", 10, "AC", "GT"), "chr5:g.10_11delinsGT");
    }

    #[test]
    fn test_first_alternate_only() {
        assert_eq!(id("1", 100, "A", "G,T"), "chr1:g.100A>G");
    }

    #[test]
    fn test_deterministic() {
        let call = VariantCall::new("7", 117559590, "ATCT", "A");
        assert_eq!(to_variant_id(&call), to_variant_id(&call.clone()));
    }

    #[test]
    fn test_malformed_calls() {
        let cases = vec![
            (VariantCall::new("", 1, "A", "G"), ConversionError::EmptyChromosome),
            (VariantCall::new("chr", 1, "A", "G"), ConversionError::EmptyChromosome),
            (VariantCall::new("1", 0, "A", "G"), ConversionError::InvalidPosition(0)),
            (VariantCall::new("1", 1, "", "G"), ConversionError::MissingAllele("reference")),
            (VariantCall::new("1", 1, "A", "."), ConversionError::MissingAllele("alternate")),
            (VariantCall::new("1", 1, "A", "a"), ConversionError::IdenticalAlleles("A".to_string())),
        ];

        for (call, expected) in cases {
            assert_eq!(to_variant_id(&call), Err(expected), "call {}", call);
        }

        let symbolic = to_variant_id(&VariantCall::new("1", 1, "A", "<DEL>"));
        assert!(matches!(symbolic, Err(ConversionError::InvalidAllele { kind: "alternate", .. })));

        let star = to_variant_id(&VariantCall::new("1", 1, "A", "*"));
        assert!(matches!(star, Err(ConversionError::InvalidAllele { .. })));
    }

    #[test]
    fn test_convert_all_reports_index() {
        let calls = vec![
            VariantCall::new("1", 1, "A", "G"),
            VariantCall::new("1", 2, "C", "T"),
            VariantCall::new("1", 3, "C", "<INS>"),
        ];

        let err = convert_all(&calls).unwrap_err();
        assert_eq!(err.0, 2);

        let ok = convert_all(&calls[..2]).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].as_str(), "chr1:g.2C>T");
    }
}
