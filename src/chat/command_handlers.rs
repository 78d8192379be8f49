use colored::*;
use reqwest::Client;

use crate::chat::display::{display_candidates, display_model_info};
use crate::compose::preceding_text;
use crate::predictor::{Candidate, ModelInfo, UNKNOWN_WORD};
use crate::server::types::{ApiResponse, PredictRequest, PredictResponse};

/// State shared by the command handlers of one chat session.
pub(super) struct ChatContext<'a> {
    pub client: &'a Client,
    pub server_url: &'a str,
    /// Everything typed so far, cursor at the end
    pub buffer: &'a mut String,
    pub context_chars: usize,
    pub last_candidates: &'a mut Vec<Candidate>,
}

/// Appends a typed line followed by a space, then asks for the next word.
pub(super) async fn handle_typed_text(context: &mut ChatContext<'_>, text: &str) {
    context.buffer.push_str(text);
    context.buffer.push(' ');
    handle_predict(context).await;
}

pub(super) async fn handle_predict(context: &mut ChatContext<'_>) {
    let request = PredictRequest {
        text: preceding_text(context.buffer.as_str(), context.context_chars).to_string(),
    };

    let url = format!("{}/api/v1/predict", context.server_url);
    match context.client.post(url).json(&request).send().await {
        Ok(response) => match response.json::<ApiResponse<PredictResponse>>().await {
            Ok(ApiResponse { data: Some(prediction), .. }) => {
                display_candidates(&prediction.candidates, prediction.elapsed_ms);
                *context.last_candidates = prediction.candidates;
            }
            Ok(ApiResponse { message, .. }) => {
                println!("{} {}", "Error:".red(), message.unwrap_or_else(|| "no candidates".to_string()));
                context.last_candidates.clear();
            }
            Err(e) => println!("Error parsing prediction: {}", e),
        },
        Err(e) => println!("Error sending prediction request: {}", e),
    }
}

/// Commits candidate `arg` (1-based) into the buffer and predicts again.
pub(super) async fn handle_pick(context: &mut ChatContext<'_>, arg: &str) {
    let index = match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= context.last_candidates.len() => n - 1,
        _ => {
            println!("Usage: pick <1-{}>", context.last_candidates.len().max(1));
            return;
        }
    };

    let word = context.last_candidates[index].word.clone();
    if word == UNKNOWN_WORD {
        println!("{}", "That slot has no word to insert".yellow());
        return;
    }

    handle_typed_text(context, &word).await;
    println!("{} {}", "Text:".bright_black(), context.buffer);
}

pub(super) fn handle_reset(context: &mut ChatContext<'_>) {
    context.buffer.clear();
    context.last_candidates.clear();
    println!("Text buffer cleared");
}

pub(super) async fn handle_model_info(context: &ChatContext<'_>) {
    let url = format!("{}/api/v1/model", context.server_url);
    match context.client.get(url).send().await {
        Ok(response) => match response.json::<ApiResponse<ModelInfo>>().await {
            Ok(ApiResponse { data: Some(info), .. }) => display_model_info(&info),
            Ok(ApiResponse { message, .. }) => {
                println!("{} {}", "Error:".red(), message.unwrap_or_default());
            }
            Err(e) => println!("Error parsing model info: {}", e),
        },
        Err(e) => println!("Error requesting model info: {}", e),
    }
}
