//! OpenAI-compatible codec (`/v1/chat/completions`).

use super::normalize::{non_empty_str, token_count, unix_seconds};
use crate::domain::{
    generate_completion_id, ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    Usage,
};
use serde::Serialize;
use serde_json::Value;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Serialize)]
pub struct OpenAiChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    pub stream: bool,
}

pub fn build_request(req: &ChatCompletionRequest) -> OpenAiChatRequest<'_> {
    OpenAiChatRequest {
        model: &req.model,
        messages: &req.messages,
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: req.effective_max_tokens(),
        seed: req.seed,
        user: req.user.as_deref(),
        stream: false,
    }
}

/// Maps an upstream OpenAI-style body into the canonical response.
///
/// `now` is used when `created` is missing or not numeric.
pub fn normalize_response(data: &Value, requested_model: &str, now: i64) -> ChatCompletionResponse {
    let id = non_empty_str(data, "id")
        .map(str::to_string)
        .unwrap_or_else(generate_completion_id);
    let created = data.get("created").and_then(unix_seconds).unwrap_or(now);
    let model = non_empty_str(data, "model")
        .unwrap_or(requested_model)
        .to_string();

    ChatCompletionResponse::new(
        id,
        created,
        model,
        normalize_choices(data.get("choices")),
        normalize_usage(data.get("usage")),
    )
}

fn normalize_choices(raw: Option<&Value>) -> Vec<ChatChoice> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let index = choice
                .get("index")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(i as u32);
            let content = choice
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let finish_reason = non_empty_str(choice, "finish_reason").map(str::to_string);
            ChatChoice::new(index, content, finish_reason)
        })
        .collect()
}

fn normalize_usage(raw: Option<&Value>) -> Usage {
    let Some(usage) = raw.filter(|u| u.is_object()) else {
        return Usage::default();
    };
    let count = |key: &str| usage.get(key).and_then(token_count);

    Usage::new(
        count("prompt_tokens").unwrap_or(0),
        count("completion_tokens").unwrap_or(0),
        count("total_tokens"),
    )
}
