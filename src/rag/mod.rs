// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Retrieval core: chunking, flat vector index, per-session stores and the
// engine that ties them to an embedding model

pub mod answer;
pub mod chunker;
pub mod engine;
pub mod errors;
pub mod vector_index;
pub mod vector_store;

pub use answer::{Answer, FragmentMode, PASSAGE_SEPARATOR};
pub use chunker::{word_count, ChunkError, SentenceChunker};
pub use engine::{IngestSummary, RetrievalConfig, RetrievalEngine};
pub use errors::{ErrorKind, RetrievalError, Stage};
pub use vector_index::{FlatL2Index, IndexError, Neighbor};
pub use vector_store::{RankedChunk, VectorStore};
