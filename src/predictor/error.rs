use std::error::Error;
use std::fmt;

use crate::gguf::GGUFError;

/// Failures surfaced by the prediction pipeline.
///
/// Lookup misses are not represented here: unknown tokens become the
/// sentinel index and unknown output indices become a placeholder word.
#[derive(Debug)]
pub enum PredictionError {
    /// A model or vocabulary artifact is missing, corrupt, or inconsistent
    /// with the configured shapes. Raised only while loading.
    ResourceLoad(String),
    /// A forward pass failed. Fatal for that call only.
    Inference(String),
}

impl PredictionError {
    pub fn resource_load(msg: impl Into<String>) -> Self {
        PredictionError::ResourceLoad(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        PredictionError::Inference(msg.into())
    }
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PredictionError::ResourceLoad(msg) => write!(f, "Failed to load resource: {}", msg),
            PredictionError::Inference(msg) => write!(f, "Inference failed: {}", msg),
        }
    }
}

impl Error for PredictionError {}

/// GGUF problems only ever happen while loading the model artifact.
impl From<GGUFError> for PredictionError {
    fn from(err: GGUFError) -> Self {
        PredictionError::ResourceLoad(err.to_string())
    }
}
