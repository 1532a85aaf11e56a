//! Ollama native codec (`/api/chat`).

use super::normalize::{iso8601_to_unix, non_empty_str, token_count};
use crate::domain::{
    generate_completion_id, ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    Usage,
};
use serde::Serialize;
use serde_json::Value;

pub const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    pub top_p: f64,
    /// Ollama's name for max new tokens.
    pub num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

pub fn build_request(req: &ChatCompletionRequest) -> OllamaChatRequest<'_> {
    OllamaChatRequest {
        model: &req.model,
        messages: &req.messages,
        stream: false,
        options: OllamaOptions {
            temperature: req.temperature,
            top_p: req.top_p,
            num_predict: req.effective_max_tokens(),
            seed: req.seed,
        },
    }
}

/// Maps an `/api/chat` body into the canonical response.
///
/// The upstream id is discarded and a fresh one generated. Ollama reports no
/// finish reason, so `stop` is always used. An absent or unparseable
/// `created_at` yields `created = 0`.
pub fn normalize_response(data: &Value, requested_model: &str) -> ChatCompletionResponse {
    let content = data
        .get("message")
        .filter(|m| m.is_object())
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let count = |key: &str| data.get(key).and_then(token_count).unwrap_or(0);
    let usage = Usage::new(count("prompt_eval_count"), count("eval_count"), None);

    let created = data
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(iso8601_to_unix)
        .unwrap_or(0);
    let model = non_empty_str(data, "model")
        .unwrap_or(requested_model)
        .to_string();

    ChatCompletionResponse::new(
        generate_completion_id(),
        created,
        model,
        vec![ChatChoice::new(0, content, None)],
        usage,
    )
}
