// ==============================================================================
// chunker.rs - Identifier Batching
// ==============================================================================
// Description: Splits the ordered identifier list into bounded request batches
// Author: Matt Barham
// Created: 2026-10-02
// Modified: 2026-10-02
// Version: 1.0.0
// ==============================================================================

use crate::config::ConfigError;
use crate::models::{Batch, VariantId};

/// Partition `ids` into contiguous batches of at most `size` identifiers
///
/// Produces `ceil(len / size)` batches in input order; only the last batch may
/// be shorter. An empty input gives no batches.
pub fn chunk(ids: &[VariantId], size: usize) -> Result<Vec<Batch>, ConfigError> {
    if size == 0 {
        return Err(ConfigError::InvalidChunkSize(size));
    }

    Ok(ids
        .chunks(size)
        .enumerate()
        .map(|(index, slice)| Batch {
            index,
            ids: slice.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<VariantId> {
        (1..=n).map(|i| VariantId::new(format!("chr1:g.{}A>G", i))).collect()
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            chunk(&ids(3), 0),
            Err(ConfigError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk(&[], 500).unwrap().is_empty());
    }

    #[test]
    fn test_batch_sizes() {
        let sizes: Vec<usize> = chunk(&ids(1200), 500).unwrap().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![500, 500, 200]);

        let sizes: Vec<usize> = chunk(&ids(1000), 500).unwrap().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![500, 500]);

        let sizes: Vec<usize> = chunk(&ids(3), 500).unwrap().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3]);
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        for (n, size) in [(1, 1), (7, 3), (10, 10), (11, 10), (250, 7), (1200, 500)] {
            let input = ids(n);
            let batches = chunk(&input, size).unwrap();

            assert_eq!(batches.len(), n.div_ceil(size), "n={} size={}", n, size);

            let joined: Vec<VariantId> = batches.iter().flat_map(|b| b.ids.iter().cloned()).collect();
            assert_eq!(joined, input, "n={} size={}", n, size);

            for (i, batch) in batches.iter().enumerate() {
                assert_eq!(batch.index, i);
                if i + 1 < batches.len() {
                    assert_eq!(batch.len(), size);
                }
            }
        }
    }
}
