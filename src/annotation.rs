// ==============================================================================
// annotation.rs - Remote Annotation Records
// ==============================================================================
// Description: Typed view over the sparse, nested JSON records returned by the
//              variant annotation source
// Author: Matt Barham
// Created: 2026-10-03
// Modified: 2026-10-10
// Version: 1.1.0
// ==============================================================================
// Record shape (abridged):
//   {
//     "query": "chr1:g.35367G>A",
//     "dbsnp": { "rsid": "rs1" },
//     "cadd": { "gene": [{ "gene_id": "ENSG..." }], "1000g": { "af": 0.1 } },
//     "gnomad_exome": { "af": { "af": 0.1, "af_male": 0.1 }, "dp": 100 },
//     "gnomad_genome": { "dp": 80 },
//     "exac": { "af": 0.2, "dp": 60 }
//   }
// Any source may be missing, null, an object, or a list of objects (one per
// matched hit). Unmatched ids come back as { "query": ..., "notfound": true }.
// ==============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::VariantId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationDecodeError {
    #[error("Annotation record is not a JSON object")]
    NotAnObject,

    #[error("Annotation record has no 'query' echo")]
    MissingQuery,
}

/// One annotation record, keyed by source name
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    /// Identifier this record answers
    pub query: VariantId,

    /// Set when the source had no match for the identifier
    pub not_found: bool,

    body: Map<String, Value>,
}

impl RawAnnotation {
    /// Decode a record as received from the source
    pub fn from_json(value: Value) -> Result<Self, AnnotationDecodeError> {
        let mut body = match value {
            Value::Object(map) => map,
            _ => return Err(AnnotationDecodeError::NotAnObject),
        };

        let query = match body.remove("query") {
            Some(Value::String(q)) => VariantId::new(q),
            _ => return Err(AnnotationDecodeError::MissingQuery),
        };

        let not_found = body
            .remove("notfound")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Self {
            query,
            not_found,
            body,
        })
    }

    /// Build a matched record from an arbitrary JSON body
    ///
    /// Non-object bodies produce a record with no sources.
    pub fn new(query: impl Into<VariantId>, body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            query: query.into(),
            not_found: false,
            body,
        }
    }

    pub fn not_found(query: impl Into<VariantId>) -> Self {
        Self {
            query: query.into(),
            not_found: true,
            body: Map::new(),
        }
    }

    /// Names of the sources present in this record
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.body.keys().map(String::as_str)
    }

    /// Follow a dotted path through nested objects
    ///
    /// A list met before the last segment is entered through its first
    /// element; the value at the last segment is returned as-is. Null counts
    /// as absent.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.body.get(*first)?;

        for segment in rest {
            current = first_hit(current)?.get(*segment)?;
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Gene annotation under `path`, as single object, list, or absent
    pub fn gene_field(&self, path: &[&str]) -> GeneField {
        GeneField::decode(self.lookup(path))
    }
}

fn first_hit(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Null => None,
        other => Some(other),
    }
}

/// One gene entry of a gene annotation
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Gene {
    #[serde(default)]
    pub gene_id: Option<String>,

    #[serde(default)]
    pub genename: Option<String>,
}

/// Gene annotation in either of the shapes the source uses
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GeneField {
    Single(Gene),
    Multiple(Vec<Gene>),
    #[default]
    Absent,
}

impl GeneField {
    /// Decode a gene value; entries that are not gene objects are dropped
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            Some(obj @ Value::Object(_)) => match Gene::deserialize(obj) {
                Ok(gene) => GeneField::Single(gene),
                Err(_) => GeneField::Absent,
            },
            Some(Value::Array(items)) => GeneField::Multiple(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Object(_) => Gene::deserialize(item).ok(),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => GeneField::Absent,
        }
    }

    /// Gene ids in source order with duplicates and missing ids removed
    pub fn gene_ids(&self) -> Vec<String> {
        let genes: &[Gene] = match self {
            GeneField::Single(gene) => std::slice::from_ref(gene),
            GeneField::Multiple(genes) => genes,
            GeneField::Absent => &[],
        };

        let mut ids: Vec<String> = Vec::with_capacity(genes.len());
        for id in genes.iter().filter_map(|g| g.gene_id.as_deref()) {
            if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}
