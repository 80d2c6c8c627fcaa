//! Word-embedding scorer: a drop-in alternative to keyword overlap.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::EngineError;
use crate::normalize::TokenSet;
use crate::similarity::SimilarityScorer;

const UNKNOWN_TOKEN: &str = "[UNK]";
// Upper bound on the up-front allocation; the header is not trusted.
const PREALLOC_ELEMENTS: usize = 1 << 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub hidden_size: usize,
    pub vocab_size: usize,
}

impl ModelConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let config_json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config_json)?)
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingModel {
    pub config: ModelConfig,
    pub embedding_matrix: Array2<f32>,
}

impl EmbeddingModel {
    pub fn new(config: ModelConfig, embedding_matrix: Array2<f32>) -> Result<Self, EngineError> {
        let (rows, cols) = embedding_matrix.dim();
        if rows != config.vocab_size || cols != config.hidden_size {
            return Err(EngineError::Embedding(format!(
                "matrix is {}x{} but config declares {}x{}",
                rows, cols, config.vocab_size, config.hidden_size
            )));
        }
        Ok(Self {
            config,
            embedding_matrix,
        })
    }

    pub fn load_model<P: AsRef<Path>>(config_path: P, embedding_path: P) -> Result<Self, EngineError> {
        let config = ModelConfig::load_from_file(config_path)?;
        let mut reader = BufReader::new(File::open(embedding_path)?);
        let embedding_matrix = read_array2(&mut reader)?;
        Self::new(config, embedding_matrix)
    }

    pub fn row(&self, token_id: usize) -> ArrayView1<'_, f32> {
        self.embedding_matrix.row(token_id)
    }

    pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
        let dot_product = a.dot(b);
        let norm_a = a.dot(a).sqrt();
        let norm_b = b.dot(b).sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }
}

/// Scores by cosine similarity of mean token vectors.
///
/// Negative cosines are clamped to 0 so the score stays in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct EmbeddingScorer {
    model: EmbeddingModel,
    vocab: HashMap<String, usize>,
    unknown_token_id: usize,
}

impl EmbeddingScorer {
    pub fn new(model: EmbeddingModel, vocab: HashMap<String, usize>) -> Self {
        let unknown_token_id = *vocab.get(UNKNOWN_TOKEN).unwrap_or(&1);
        Self {
            model,
            vocab,
            unknown_token_id,
        }
    }

    /// Loads the model config, embedding matrix and vocabulary JSON.
    pub fn load<P: AsRef<Path>>(
        config_path: P,
        embedding_path: P,
        vocab_path: P,
    ) -> Result<Self, EngineError> {
        let model = EmbeddingModel::load_model(config_path, embedding_path)?;
        let vocab: HashMap<String, usize> =
            serde_json::from_str(&std::fs::read_to_string(vocab_path)?)?;
        Ok(Self::new(model, vocab))
    }

    fn sentence_embedding(&self, tokens: &TokenSet) -> Array1<f32> {
        let hidden_size = self.model.config.hidden_size;
        let mut sum = Array1::<f32>::zeros(hidden_size);
        if tokens.is_empty() {
            return sum;
        }
        for token in tokens.iter() {
            let id = self
                .vocab
                .get(token)
                .copied()
                .filter(|&id| id < self.model.config.vocab_size)
                .unwrap_or(self.unknown_token_id);
            if id < self.model.config.vocab_size {
                sum += &self.model.row(id);
            }
        }
        sum / tokens.len() as f32
    }
}

impl SimilarityScorer for EmbeddingScorer {
    fn score(&self, input: &TokenSet, pattern: &TokenSet) -> f32 {
        if input.is_empty() || pattern.is_empty() {
            return 0.0;
        }
        let a = self.sentence_embedding(input);
        let b = self.sentence_embedding(pattern);
        EmbeddingModel::cosine_similarity(&a, &b).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "embedding"
    }
}

/// Reads a row-major `f32` matrix preceded by little-endian `u64` rows and cols.
pub fn read_array2<R: Read>(reader: &mut R) -> Result<Array2<f32>, EngineError> {
    let mut shape_buf = [0u8; 8];
    reader.read_exact(&mut shape_buf)?;
    let rows = u64::from_le_bytes(shape_buf) as usize;
    reader.read_exact(&mut shape_buf)?;
    let cols = u64::from_le_bytes(shape_buf) as usize;
    let total_elements = rows
        .checked_mul(cols)
        .ok_or_else(|| EngineError::Embedding(format!("shape {}x{} overflows", rows, cols)))?;
    let mut data = Vec::with_capacity(total_elements.min(PREALLOC_ELEMENTS));
    let mut float_buf = [0u8; 4];
    for _ in 0..total_elements {
        reader.read_exact(&mut float_buf)?;
        data.push(f32::from_le_bytes(float_buf));
    }
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| EngineError::Embedding(format!("shape and data mismatch: {}", e)))
}
