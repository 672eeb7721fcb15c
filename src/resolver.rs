// ==============================================================================
// resolver.rs - Annotation Field Resolution
// ==============================================================================
// Description: Reduces one sparse annotation record to a flat summary row by
//              walking fixed, per-field source priority lists
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-14
// Version: 1.1.0
// ==============================================================================
// Priority (first present value wins, later sources are fallbacks):
//   rsid         dbsnp.rsid
//   gene_ids     cadd.gene[*].gene_id
//   global_freq  gnomad_exome.af.af > cadd.1000g.af > exac.af
//   male_freq    gnomad_exome.af.af_male
//   female_freq  gnomad_exome.af.af_female
//   global_dp    gnomad_exome.dp > gnomad_genome.dp > exac.dp
// ==============================================================================

use serde_json::Value;

use crate::annotation::RawAnnotation;
use crate::models::ResolvedVariant;

type FieldPath = &'static [&'static str];

const RSID: &[FieldPath] = &[&["dbsnp", "rsid"]];

const GENES: FieldPath = &["cadd", "gene"];

const GLOBAL_FREQ: &[FieldPath] = &[
    &["gnomad_exome", "af", "af"],
    &["cadd", "1000g", "af"],
    &["exac", "af"],
];

const MALE_FREQ: &[FieldPath] = &[&["gnomad_exome", "af", "af_male"]];

const FEMALE_FREQ: &[FieldPath] = &[&["gnomad_exome", "af", "af_female"]];

const GLOBAL_DP: &[FieldPath] = &[
    &["gnomad_exome", "dp"],
    &["gnomad_genome", "dp"],
    &["exac", "dp"],
];

/// Resolve a record into its summary row
///
/// Never fails: anything missing, null, or of the wrong shape resolves to
/// absent. A not-found record yields a row with only the query set.
pub fn resolve(record: &RawAnnotation) -> ResolvedVariant {
    ResolvedVariant {
        query: record.query.clone(),
        rsid: first_present(record, RSID, as_text),
        gene_ids: record.gene_field(GENES).gene_ids(),
        global_freq: first_present(record, GLOBAL_FREQ, as_frequency),
        male_freq: first_present(record, MALE_FREQ, as_frequency),
        female_freq: first_present(record, FEMALE_FREQ, as_frequency),
        global_dp: first_present(record, GLOBAL_DP, as_depth),
    }
}

pub fn resolve_all(records: &[RawAnnotation]) -> Vec<ResolvedVariant> {
    records.iter().map(resolve).collect()
}

fn first_present<T>(
    record: &RawAnnotation,
    paths: &[FieldPath],
    convert: fn(&Value) -> Option<T>,
) -> Option<T> {
    paths
        .iter()
        .find_map(|path| record.lookup(path).and_then(first_scalar).and_then(convert))
}

/// Lists of values (one per hit) resolve through their first element
fn first_scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first().filter(|v| !v.is_null()),
        Value::Null => None,
        other => Some(other),
    }
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_frequency(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|f| f.is_finite() && (0.0..=1.0).contains(f))
}

fn as_depth(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|d| d.is_finite() && *d >= 0.0 && d.fract() == 0.0 && *d <= u64::MAX as f64)
            .map(|d| d as u64)
    })
}
