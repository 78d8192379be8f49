use serde::{Deserialize, Serialize};

use crate::predictor::Candidate;

/// Request for next-word candidates
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct PredictRequest {
    /// Text before the cursor
    pub text: String,
}

/// Ranked candidates for one request
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictResponse {
    pub candidates: Vec<Candidate>,
    pub elapsed_ms: f64,
}

/// Generic API response wrapper
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
