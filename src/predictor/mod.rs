//! # Prediction subsystem
//!
//! Raw preceding text flows through four stages:
//!
//! - `Tokenizer`: normalizes the text and maps it to a fixed-length index sequence
//! - `InferenceEngine`: one forward pass of the pretrained network
//! - `rank`: turns the score row into the best scoring words
//! - `Predictor`: runs the three above behind a single `predict` call
//!
//! The vocabulary and the model are loaded once and are read-only afterwards.

mod engine;
mod error;
mod facade;
pub mod model;
mod ranker;
mod scaffold;
mod tokenizer;
mod vocabulary;

pub use engine::{InferenceEngine, ScoreVector};
pub use error::PredictionError;
pub use facade::{ModelInfo, Predictor};
pub use model::{ForwardPass, LstmConfig, LstmModel};
pub use ranker::{rank, Candidate, UNKNOWN_WORD};
pub use scaffold::{build_vocabulary, write_demo_artifacts, DemoArtifacts};
pub use tokenizer::{TokenSequence, Tokenizer};
pub use vocabulary::VocabularyTable;

/// Sequence length the bundled model was trained on
pub const MAX_LEN: usize = 54;

/// Output width of the bundled model
pub const VOCAB_SIZE: usize = 13598;

/// Number of candidates offered to the keyboard
pub const TOP_K: usize = 3;

/// Unknown-word and padding index
pub const SENTINEL_INDEX: u32 = 0;
