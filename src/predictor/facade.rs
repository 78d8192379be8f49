use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::engine::InferenceEngine;
use super::error::PredictionError;
use super::ranker::{rank, Candidate};
use super::tokenizer::Tokenizer;
use super::vocabulary::VocabularyTable;
use super::TOP_K;
use crate::config::PredictorConfig;

/// Summary of the loaded artifacts, for display and the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub architecture: String,
    pub model_path: Option<String>,
    pub max_len: usize,
    pub vocab_size: usize,
    pub vocabulary_words: usize,
    pub hyperparameters: BTreeMap<String, usize>,
    #[serde(with = "ts_seconds")]
    pub loaded_at: DateTime<Utc>,
}

/// Text in, ranked candidates out.
///
/// Owns the vocabulary and the inference engine for its whole lifetime.
/// Calls are synchronous; callers sharing one predictor across threads must
/// serialize access themselves.
pub struct Predictor {
    vocabulary: Arc<VocabularyTable>,
    tokenizer: Tokenizer,
    engine: InferenceEngine,
    model_path: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
}

impl Predictor {
    /// Loads both artifacts and checks that their shapes agree.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        model_path: P,
        vocabulary_path: Q,
        max_len: usize,
        vocab_size: usize,
    ) -> Result<Self, PredictionError> {
        let vocabulary = VocabularyTable::load(vocabulary_path)?;
        let engine = InferenceEngine::initialize(model_path.as_ref(), max_len, vocab_size)?;

        let mut predictor = Self::new(vocabulary, engine)?;
        predictor.model_path = Some(model_path.as_ref().to_path_buf());
        info!("Predictor ready: {} words, sequence length {}", predictor.vocabulary.len(), max_len);
        Ok(predictor)
    }

    pub fn from_config(config: &PredictorConfig) -> Result<Self, PredictionError> {
        Self::load(&config.model_path, &config.vocabulary_path, config.max_len, config.vocab_size)
    }

    /// Assembles a predictor from already loaded parts.
    pub fn new(vocabulary: VocabularyTable, engine: InferenceEngine) -> Result<Self, PredictionError> {
        let vocab_size = engine.output_len();
        if vocabulary.index_space() != vocab_size {
            return Err(PredictionError::resource_load(format!(
                "Vocabulary index space is {}, model output width is {}",
                vocabulary.index_space(),
                vocab_size
            )));
        }
        if vocab_size < TOP_K + 1 {
            return Err(PredictionError::resource_load(format!(
                "Vocabulary of size {} cannot produce {} candidates",
                vocab_size, TOP_K
            )));
        }

        let vocabulary = Arc::new(vocabulary);
        let tokenizer = Tokenizer::new(Arc::clone(&vocabulary), engine.input_len());
        Ok(Self {
            vocabulary,
            tokenizer,
            engine,
            model_path: None,
            loaded_at: Utc::now(),
        })
    }

    /// Ranks the likely next words after `preceding_text`.
    ///
    /// The empty string is a valid cold-start query.
    pub fn predict(&self, preceding_text: &str) -> Result<Vec<Candidate>, PredictionError> {
        let sequence = self.tokenizer.encode(preceding_text);
        let scores = self.engine.run(&sequence).map_err(|e| {
            error!("Prediction failed for {} chars of input: {}", preceding_text.chars().count(), e);
            e
        })?;
        let candidates = rank(&scores, &self.vocabulary, TOP_K);

        debug!(
            "Predicted {:?}",
            candidates.iter().map(|c| c.word.as_str()).collect::<Vec<_>>()
        );
        Ok(candidates)
    }

    pub fn vocabulary(&self) -> &VocabularyTable {
        &self.vocabulary
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            architecture: self.engine.architecture().to_string(),
            model_path: self.model_path.as_ref().map(|p| p.display().to_string()),
            max_len: self.engine.input_len(),
            vocab_size: self.engine.output_len(),
            vocabulary_words: self.vocabulary.len(),
            hyperparameters: self.engine.hyperparameters(),
            loaded_at: self.loaded_at,
        }
    }
}
