// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for variant call file formats
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-14
// Version: 2.0.0
// ==============================================================================

pub mod vcf;

pub use vcf::{VcfParseError, VcfReader};
