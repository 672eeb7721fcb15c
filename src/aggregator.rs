// ==============================================================================
// aggregator.rs - Result Table Assembly
// ==============================================================================
// Description: Collects resolved rows into a column-oriented result table
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-12
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;

use crate::models::ResolvedVariant;

/// Separator used when flattening a row's gene ids into one cell
pub const GENE_SEPARATOR: &str = ",";

/// Column names in output order
pub const COLUMNS: [&str; 7] = ["hgvs", "rsid", "genes", "freq", "male_freq", "female_freq", "dp"];

/// Column-oriented result table; every column has one entry per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub hgvs: Vec<String>,
    pub rsid: Vec<Option<String>>,
    /// Comma-joined gene ids; empty string when the row has none
    pub genes: Vec<String>,
    pub freq: Vec<Option<f64>>,
    pub male_freq: Vec<Option<f64>>,
    pub female_freq: Vec<Option<f64>>,
    pub dp: Vec<Option<u64>>,
}

/// One table row borrowed from the columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableRow<'a> {
    pub hgvs: &'a str,
    pub rsid: Option<&'a str>,
    pub genes: &'a str,
    pub freq: Option<f64>,
    pub male_freq: Option<f64>,
    pub female_freq: Option<f64>,
    pub dp: Option<u64>,
}

impl ResultTable {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            hgvs: Vec::with_capacity(rows),
            rsid: Vec::with_capacity(rows),
            genes: Vec::with_capacity(rows),
            freq: Vec::with_capacity(rows),
            male_freq: Vec::with_capacity(rows),
            female_freq: Vec::with_capacity(rows),
            dp: Vec::with_capacity(rows),
        }
    }

    pub fn push(&mut self, row: ResolvedVariant) {
        self.hgvs.push(row.query.into_inner());
        self.rsid.push(row.rsid);
        self.genes.push(row.gene_ids.join(GENE_SEPARATOR));
        self.freq.push(row.global_freq);
        self.male_freq.push(row.male_freq);
        self.female_freq.push(row.female_freq);
        self.dp.push(row.global_dp);
    }

    pub fn len(&self) -> usize {
        self.hgvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hgvs.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<TableRow<'_>> {
        Some(TableRow {
            hgvs: self.hgvs.get(i)?,
            rsid: self.rsid.get(i)?.as_deref(),
            genes: self.genes.get(i)?,
            freq: *self.freq.get(i)?,
            male_freq: *self.male_freq.get(i)?,
            female_freq: *self.female_freq.get(i)?,
            dp: *self.dp.get(i)?,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}

/// Assemble rows into a table, preserving their order
pub fn aggregate(rows: Vec<ResolvedVariant>) -> ResultTable {
    let mut table = ResultTable::with_capacity(rows.len());
    for row in rows {
        table.push(row);
    }
    table
}
