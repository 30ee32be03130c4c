//! Flat inner-product search structure
//!
//! Exhaustive scan over a contiguous row-major matrix of unit vectors. With
//! both sides L2-normalised the inner product is the cosine similarity.

use finrag_common::errors::{AppError, Result};
use std::cmp::Ordering;

/// Row-major matrix of L2-normalised vectors
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Normalise and append a batch of vectors.
    ///
    /// The whole batch is checked before anything is appended, so a mismatch
    /// leaves the structure unchanged.
    pub fn add(&mut self, batch: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = batch.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.vectors.reserve(batch.len() * self.dimension);
        for vector in batch {
            let mut row = vector.clone();
            l2_normalize(&mut row);
            self.vectors.extend_from_slice(&row);
        }
        Ok(())
    }

    /// Top `n` rows by inner product with `query` as `(row, score)` pairs.
    ///
    /// The query is normalised here. Results are sorted by descending score;
    /// equal scores keep insertion order.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if n == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, v)| (row, dot(&q, v).clamp(-1.0, 1.0)))
            .collect();

        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(n);

        Ok(scored)
    }
}

/// Scale `v` to unit length in place; zero vectors are left untouched
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_search_orders_by_cosine() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![0.0, 5.0], vec![2.0, 2.0], vec![10.0, 0.0]])
            .unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = results.iter().map(|(row, _)| *row).collect();
        assert_eq!(rows, vec![2, 1, 0]);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert!(results[2].1.abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![1.0, 1.0], vec![0.0, 1.0], vec![1.0, 1.0]])
            .unwrap();

        let results = index.search(&[1.0, 1.0], 2).unwrap();
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        let err = index.add(&[vec![1.0, 0.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { expected: 3, actual: 1 }));
        assert!(index.is_empty());

        index.add(&[vec![1.0, 0.0, 0.0]]).unwrap();
        tokio_test::assert_err!(index.search(&[1.0, 0.0], 1));
    }

    #[test]
    fn test_search_truncates_to_n() {
        let mut index = FlatIndex::new(1);
        index.add(&[vec![1.0], vec![1.0], vec![-1.0]]).unwrap();

        assert_eq!(index.search(&[1.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0], 10).unwrap().len(), 3);
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }
}
