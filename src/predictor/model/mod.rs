mod lstm;

pub use lstm::{LstmConfig, LstmModel, ARCHITECTURE};

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use super::error::PredictionError;

/// One evaluation of a pretrained next-word network.
///
/// Input is a `[1, input_len]` row of token indices encoded as floats; output
/// is a `[1, output_len]` row of scores aligned with the vocabulary.
pub trait ForwardPass: Send + Sync {
    /// Short identifier of the network family
    fn architecture(&self) -> &str;

    /// Declared input width (sequence length)
    fn input_len(&self) -> usize;

    /// Declared output width (vocabulary size)
    fn output_len(&self) -> usize;

    /// Named sizes worth reporting, e.g. hidden width
    fn hyperparameters(&self) -> BTreeMap<String, usize> {
        BTreeMap::new()
    }

    fn forward(&self, input: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictionError>;
}
