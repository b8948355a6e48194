// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence-transformer adapter (all-MiniLM-L6-v2)
//!
//! Enabled with the `onnx` cargo feature. Tokenizes a batch with the
//! HuggingFace tokenizer, pads to the longest sequence, runs one ONNX Runtime
//! inference and mean-pools token embeddings under the attention mask.
//! Inference is CPU-bound, so it runs on the blocking thread pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::info;

use super::{validate_batch, EmbeddingAdapter, EmbeddingError};

/// Hidden size of all-MiniLM-L6-v2
const MINILM_DIMENSION: usize = 384;

#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    /// `Session::run` needs `&mut`, so calls are serialized
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Load the model and tokenizer from disk
    ///
    /// # Errors
    /// Missing files, an invalid ONNX graph or tokenizer, or a model whose
    /// output is not `[batch, seq_len, 384]`.
    pub fn load<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: MINILM_DIMENSION,
        };

        // Probe once so a wrong model fails at startup, not on first ingest
        let probe = model.run_batch(&["validation probe".to_string()])?;
        if probe.first().map(Vec::len) != Some(MINILM_DIMENSION) {
            anyhow::bail!(
                "Model {} does not produce {}-dimensional embeddings",
                model.model_name,
                MINILM_DIMENSION
            );
        }

        info!("Loaded ONNX embedding model {}", model.model_name);
        Ok(model)
    }

    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = texts.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch * max_len);
        let mut attention_mask = Vec::with_capacity(batch * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let padding = max_len - ids.len();
            input_ids.extend(ids.iter().map(|&id| i64::from(id)));
            input_ids.extend(std::iter::repeat(0i64).take(padding));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| i64::from(m)));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));
        }

        let pooling_mask = attention_mask.clone();
        let input_ids = Array2::from_shape_vec((batch, max_len), input_ids)
            .context("Failed to shape input_ids")?;
        let attention_mask = Array2::from_shape_vec((batch, max_len), attention_mask)
            .context("Failed to shape attention_mask")?;
        let token_type_ids = Array2::<i64>::zeros((batch, max_len));

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        // [batch, seq_len, hidden]
        let hidden_states = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mut embeddings = Vec::with_capacity(batch);
        for item in 0..batch {
            let tokens = hidden_states.index_axis(Axis(0), item);
            let hidden = tokens.shape()[1];
            let mask = &pooling_mask[item * max_len..(item + 1) * max_len];

            let mut pooled = vec![0.0f32; hidden];
            let mut mask_sum = 0.0f32;
            for (position, &m) in mask.iter().enumerate() {
                let weight = m as f32;
                mask_sum += weight;
                for (j, value) in pooled.iter_mut().enumerate() {
                    *value += tokens[[position, j]] * weight;
                }
            }
            for value in &mut pooled {
                *value /= mask_sum.max(1e-9);
            }
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = self.clone();
        let owned = texts.to_vec();

        let vectors = tokio::task::spawn_blocking(move || model.run_batch(&owned))
            .await
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        validate_batch(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
