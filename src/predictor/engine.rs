use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use ndarray::Array2;
use tracing::debug;

use super::error::PredictionError;
use super::model::{ForwardPass, LstmModel};
use super::tokenizer::TokenSequence;

/// Scores for every vocabulary index, as produced by one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for ScoreVector {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores)
    }
}

/// Owns the loaded network and runs single-row forward passes over it.
///
/// Stateless between calls; the same engine serves any number of sequences.
pub struct InferenceEngine {
    model: Box<dyn ForwardPass>,
}

impl InferenceEngine {
    /// Loads the bundled network and checks it against the expected shapes.
    pub fn initialize<P: AsRef<Path>>(
        model_path: P,
        max_len: usize,
        vocab_size: usize,
    ) -> Result<Self, PredictionError> {
        let model = LstmModel::load(model_path)?;
        Self::with_model(Box::new(model), max_len, vocab_size)
    }

    /// Wraps any forward pass implementation whose declared widths match.
    pub fn with_model(
        model: Box<dyn ForwardPass>,
        max_len: usize,
        vocab_size: usize,
    ) -> Result<Self, PredictionError> {
        if model.input_len() != max_len {
            return Err(PredictionError::resource_load(format!(
                "Model expects sequences of {} tokens, configured max_len is {}",
                model.input_len(),
                max_len
            )));
        }
        if model.output_len() != vocab_size {
            return Err(PredictionError::resource_load(format!(
                "Model output width is {}, configured vocab_size is {}",
                model.output_len(),
                vocab_size
            )));
        }
        Ok(Self { model })
    }

    pub fn input_len(&self) -> usize {
        self.model.input_len()
    }

    pub fn output_len(&self) -> usize {
        self.model.output_len()
    }

    pub fn architecture(&self) -> &str {
        self.model.architecture()
    }

    pub fn hyperparameters(&self) -> BTreeMap<String, usize> {
        self.model.hyperparameters()
    }

    /// Runs one forward pass over a `[1, max_len]` input built from `sequence`.
    pub fn run(&self, sequence: &TokenSequence) -> Result<ScoreVector, PredictionError> {
        let input_len = self.model.input_len();
        if sequence.len() != input_len {
            return Err(PredictionError::inference(format!(
                "Sequence has {} tokens, model expects {}",
                sequence.len(),
                input_len
            )));
        }

        let row: Vec<f32> = sequence.as_slice().iter().map(|&t| t as f32).collect();
        let input = Array2::from_shape_vec((1, input_len), row)
            .map_err(|e| PredictionError::inference(e.to_string()))?;

        let start = Instant::now();
        let output = self.model.forward(input.view())?;
        debug!("Forward pass took {} ns", start.elapsed().as_nanos());

        let output_len = self.model.output_len();
        if output.shape() != [1, output_len] {
            return Err(PredictionError::inference(format!(
                "Model returned shape {:?}, expected [1, {}]",
                output.shape(),
                output_len
            )));
        }

        Ok(ScoreVector(output.iter().copied().collect()))
    }
}
