pub mod chat;
pub mod compose;
pub mod config;
pub mod gguf;
pub mod predictor;
pub mod server;
