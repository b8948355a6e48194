// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Exact nearest-neighbour index
//!
//! Vectors are stored verbatim and every query scans all of them. A session
//! indexes one document (at most a few hundred sentences), so an exhaustive
//! scan beats the build cost of an approximate structure.

use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("Search on an empty index")]
    EmptyIndex,

    #[error("Invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    #[error("Dimension mismatch at vector {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Vector {position} contains NaN or Infinity")]
    NonFiniteVector { position: usize },

    #[error("Vectors must have at least one dimension")]
    ZeroDimension,

    #[error("Got {embeddings} embeddings for {chunks} chunks")]
    LengthMismatch { chunks: usize, embeddings: usize },
}

/// One search hit: insertion position of the stored vector and its squared
/// Euclidean distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Flat (brute-force) L2 index
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Build an index over `vectors`, keeping insertion order
    ///
    /// All vectors must share one non-zero dimension and contain only finite
    /// values. An empty input builds an empty index.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimension = match vectors.first() {
            Some(first) if first.is_empty() => return Err(IndexError::ZeroDimension),
            Some(first) => first.len(),
            None => 0,
        };

        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::NonFiniteVector { position });
            }
        }

        Ok(Self { dimension, vectors })
    }

    /// Return the `min(k, len)` nearest vectors, ascending by distance
    ///
    /// Equal distances rank the earlier-inserted vector first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if k < 1 {
            return Err(IndexError::InvalidK(k));
        }
        if self.vectors.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                position: 0,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFiniteVector { position: 0 });
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor {
                index,
                distance: squared_l2(query, vector),
            })
            .collect();

        neighbors.sort_by(compare_neighbors);
        neighbors.truncate(k);

        Ok(neighbors)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension of stored vectors (0 for an empty index)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// Squared Euclidean distance; callers guarantee equal lengths
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
