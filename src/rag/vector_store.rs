// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Per-document vector storage for retrieval
// A store is immutable once built; re-ingest replaces it wholesale

use std::time::Instant;

use super::vector_index::{FlatL2Index, IndexError};

/// A retrieved passage with its rank position
#[derive(Clone, Debug, PartialEq)]
pub struct RankedChunk {
    /// Position of the chunk in the source document
    pub chunk_index: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
    pub text: String,
}

/// Chunks, their embeddings and the search index for one document
///
/// - `chunks[i]` was embedded as `embeddings()[i]`
/// - Chunk order is the order of first occurrence in the source text
/// - Never mutated after construction; sessions share it behind an `Arc`
#[derive(Debug)]
pub struct VectorStore {
    chunks: Vec<String>,
    index: FlatL2Index,
    built_at: Instant,
}

impl VectorStore {
    /// Create a store from parallel chunk and embedding sequences
    ///
    /// # Returns
    /// * `Err(IndexError::LengthMismatch)` if the sequences differ in length
    /// * `Err(IndexError::DimensionMismatch)` if vectors disagree on dimension
    /// * `Err(IndexError::NonFiniteVector)` if an embedding contains NaN/Infinity
    pub fn new(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let index = FlatL2Index::build(embeddings)?;

        Ok(Self {
            chunks,
            index,
            built_at: Instant::now(),
        })
    }

    /// Search for the `k` chunks closest to `query`
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RankedChunk>, IndexError> {
        let neighbors = self.index.search(query, k)?;

        Ok(neighbors
            .into_iter()
            .map(|n| RankedChunk {
                chunk_index: n.index,
                distance: n.distance,
                text: self.chunks[n.index].clone(),
            })
            .collect())
    }

    pub fn chunk(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Embeddings in chunk order (held verbatim by the flat index)
    pub fn embeddings(&self) -> &[Vec<f32>] {
        self.index.vectors()
    }

    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }
}
