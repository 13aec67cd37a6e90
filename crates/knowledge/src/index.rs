//! Exact nearest-neighbour index over chunk embeddings.
//!
//! Vectors are stored in one contiguous row-major matrix; row `i` belongs to
//! chunk `i`. Search is a full scan by squared Euclidean distance.

use crimestat_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Flat (brute-force) L2 index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from positionally aligned embeddings.
    ///
    /// Every vector must have exactly `dimensions` components. An empty
    /// input yields an empty (but built) index.
    pub fn build(dimensions: usize, embeddings: &[Vec<f32>]) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Knowledge(
                "Index dimensions must be greater than zero".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimensions * embeddings.len());
        for (position, vector) in embeddings.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(AppError::Knowledge(format!(
                    "Embedding {} has {} dimensions, index expects {}",
                    position,
                    vector.len(),
                    dimensions
                )));
            }
            data.extend_from_slice(vector);
        }

        tracing::debug!(
            "Built flat index: {} vectors x {} dimensions",
            embeddings.len(),
            dimensions
        );

        Ok(Self { dimensions, data })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// The `n` nearest rows to `query` as `(position, squared distance)`.
    ///
    /// Results are ascending by distance, ties broken by ascending position.
    /// Returns `min(n, len)` entries.
    pub fn search(&self, query: &[f32], n: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }
        if n == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .map(|row| squared_l2(query, row))
            .enumerate()
            .collect();

        let n = n.min(scored.len());
        if n < scored.len() {
            scored.select_nth_unstable_by(n - 1, compare_hits);
            scored.truncate(n);
        }
        scored.sort_by(compare_hits);

        Ok(scored)
    }
}

fn compare_hits(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FlatIndex {
        FlatIndex::build(
            2,
            &[
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.0, 3.0],
                vec![1.0, 0.0],
                vec![5.0, 5.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_and_len() {
        let index = index();
        assert_eq!(index.len(), 5);
        assert_eq!(index.dimensions(), 2);
        assert_eq!(index.vector(2), Some(&[0.0, 3.0][..]));
        assert_eq!(index.vector(5), None);
    }

    #[test]
    fn test_search_ordering_and_ties() {
        let results = index().search(&[1.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = results.iter().map(|(p, _)| *p).collect();
        // Positions 1 and 3 tie at distance 0
        assert_eq!(positions, vec![1, 3, 0]);
        assert_eq!(results[0].1, 0.0);
        assert_eq!(results[2].1, 1.0);
    }

    #[test]
    fn test_search_result_bounds() {
        let index = index();
        for n in 0..8 {
            let results = index.search(&[2.0, 2.0], n).unwrap();
            assert_eq!(results.len(), n.min(index.len()));
            assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
        }
    }

    #[test]
    fn test_empty_index() {
        let index = FlatIndex::build(4, &[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.search(&[0.0; 4], 3).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = FlatIndex::build(3, &[vec![1.0, 2.0, 3.0], vec![1.0]]);
        assert!(matches!(result, Err(AppError::Knowledge(_))));

        assert!(index().search(&[1.0, 2.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }
}
