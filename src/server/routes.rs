use axum::{
    Json,
    extract::State,
    response::IntoResponse,
    http::StatusCode,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, debug, error};

use crate::predictor::{ModelInfo, Predictor};
use super::types::{ApiResponse, PredictRequest, PredictResponse};

/// Shared, serialized access to the one loaded predictor
pub type SharedPredictor = Arc<Mutex<Predictor>>;

/// Router state. The model summary is fixed at load time, so it is kept
/// outside the lock.
#[derive(Clone)]
pub struct AppState {
    pub predictor: SharedPredictor,
    pub info: Arc<ModelInfo>,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        let info = Arc::new(predictor.info());
        Self {
            predictor: Arc::new(Mutex::new(predictor)),
            info,
        }
    }
}

/// Returns a health check response
pub async fn health_check() -> &'static str {
    info!("Health check endpoint called");
    "nextword is running!"
}

/// Ranks the next-word candidates for the submitted text.
///
/// Inference is CPU bound, so it runs on the blocking pool.
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> impl IntoResponse {
    debug!("Predict endpoint called with {} chars", request.text.chars().count());

    let started = Instant::now();
    let predictor = Arc::clone(&state.predictor);
    let outcome = tokio::task::spawn_blocking(move || {
        let predictor = predictor
            .lock()
            .map_err(|e| format!("Predictor lock poisoned: {}", e))?;
        predictor.predict(&request.text).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Prediction task failed: {}", e))
    .and_then(|result| result);

    match outcome {
        Ok(candidates) => {
            let response = PredictResponse {
                candidates,
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            };
            (StatusCode::OK, Json(ApiResponse::success(response)))
        }
        Err(e) => {
            error!("Failed to predict: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<PredictResponse>::error(format!("Failed to predict: {}", e))),
            )
        }
    }
}

/// Describes the loaded model and vocabulary.
pub async fn model_info(State(state): State<AppState>) -> impl IntoResponse {
    info!("Model info endpoint called");
    (StatusCode::OK, Json(ApiResponse::success((*state.info).clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{ForwardPass, InferenceEngine, PredictionError, VocabularyTable};
    use axum::response::Response;
    use ndarray::{Array2, ArrayView2};

    struct FlatModel;

    impl ForwardPass for FlatModel {
        fn architecture(&self) -> &str {
            "flat"
        }

        fn input_len(&self) -> usize {
            4
        }

        fn output_len(&self) -> usize {
            5
        }

        fn forward(&self, _input: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictionError> {
            Ok(Array2::from_elem((1, 5), 0.2))
        }
    }

    fn state() -> AppState {
        let vocabulary =
            VocabularyTable::from_json(r#"{"the": 1, "cat": 2, "sat": 3, "mat": 4}"#).unwrap();
        let engine = InferenceEngine::with_model(Box::new(FlatModel), 4, 5).unwrap();
        AppState::new(Predictor::new(vocabulary, engine).unwrap())
    }

    #[tokio::test]
    async fn test_model_info_answers_while_predictor_is_busy() {
        let state = state();
        let _busy = state.predictor.lock().unwrap();

        let response: Response = model_info(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.info.architecture, "flat");
        assert_eq!(state.info.vocabulary_words, 4);
    }
}
