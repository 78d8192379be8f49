use std::error::Error;
use tokio::net::TcpListener;
use axum::{Router, routing::{get, post}};
use tracing::info;

use crate::config::ServerConfig;
use crate::predictor::Predictor;
use super::routes::{self, AppState};

/// API Server answering prediction requests
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(predictor: Predictor, host: String, port: u16) -> Self {
        info!("Creating new API server on {}:{}", host, port);
        Self {
            state: AppState::new(predictor),
            host,
            port,
        }
    }

    pub fn from_config(predictor: Predictor, config: &ServerConfig) -> Self {
        Self::new(predictor, config.host.clone(), config.port)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/v1/health", get(routes::health_check))
            .route("/api/v1/predict", post(routes::predict))
            .route("/api/v1/model", get(routes::model_info))
            .with_state(self.state.clone())
    }

    pub async fn start(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!("Starting server on {}:{}", self.host, self.port);
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!("Server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
