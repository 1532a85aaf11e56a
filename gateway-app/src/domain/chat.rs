use gateway_errors::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CHAT_COMPLETION_OBJECT: &str = "chat.completion";
pub const DEFAULT_FINISH_REASON: &str = "stop";

const DEFAULT_TEMPERATURE: f64 = 0.2;
const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_MAX_TOKENS: u32 = 256;
const COMPLETION_ID_PREFIX: &str = "chatcmpl-";
const COMPLETION_ID_HEX_LEN: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Vendor-neutral chat completion request.
///
/// `max_token` is the legacy spelling of `max_tokens`; it is only consulted
/// when `max_tokens` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_token: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: None,
            max_token: None,
            seed: None,
            user: None,
            stream: false,
        }
    }

    /// Max new tokens, resolving the legacy field name and the default.
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens
            .or(self.max_token)
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Rejects features the translation layer does not implement.
    pub fn ensure_supported(&self) -> Result<(), AppError> {
        if self.stream {
            return Err(AppError::StreamNotSupported);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
}

impl ChoiceMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: String,
}

impl ChatChoice {
    pub fn new(index: u32, content: impl Into<String>, finish_reason: Option<String>) -> Self {
        Self {
            index,
            message: ChoiceMessage::assistant(content),
            finish_reason: finish_reason.unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string()),
        }
    }

    /// The single placeholder choice used when the upstream returned none.
    pub fn empty() -> Self {
        Self::new(0, "", None)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: Option<u64>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: total_tokens.unwrap_or(prompt_tokens.saturating_add(completion_tokens)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

impl ChatCompletionResponse {
    pub fn new(
        id: String,
        created: i64,
        model: String,
        mut choices: Vec<ChatChoice>,
        usage: Usage,
    ) -> Self {
        if choices.is_empty() {
            choices.push(ChatChoice::empty());
        }
        Self {
            id,
            object: CHAT_COMPLETION_OBJECT.to_string(),
            created,
            model,
            choices,
            usage,
        }
    }
}

/// Fresh completion id: fixed prefix plus a random hex suffix.
pub fn generate_completion_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", COMPLETION_ID_PREFIX, &hex[..COMPLETION_ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "mistral",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.top_p, 1.0);
        assert_eq!(req.effective_max_tokens(), 256);
        assert_eq!(req.seed, None);
        assert_eq!(req.user, None);
        assert!(!req.stream);
    }

    #[test]
    fn test_legacy_max_token() {
        let legacy: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "m",
            "messages": [],
            "max_token": 64
        }))
        .unwrap();
        assert_eq!(legacy.effective_max_tokens(), 64);

        let both: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "m",
            "messages": [],
            "max_tokens": 32,
            "max_token": 64
        }))
        .unwrap();
        assert_eq!(both.effective_max_tokens(), 32);
    }

    #[test]
    fn test_role_validation() {
        let bad = serde_json::from_value::<ChatCompletionRequest>(json!({
            "model": "m",
            "messages": [{"role": "tool", "content": "x"}]
        }));
        assert!(bad.is_err());

        let missing_role: ChatMessage = serde_json::from_value(json!({"content": "x"})).unwrap();
        assert_eq!(missing_role.role, Role::User);
    }

    #[test]
    fn test_missing_messages_rejected() {
        let missing = serde_json::from_value::<ChatCompletionRequest>(json!({"model": "x"}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_stream_unsupported() {
        let mut req = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        assert!(req.ensure_supported().is_ok());

        req.stream = true;
        assert!(matches!(
            req.ensure_supported(),
            Err(AppError::StreamNotSupported)
        ));
    }

    #[test]
    fn test_response_never_empty() {
        let resp = ChatCompletionResponse::new(
            generate_completion_id(),
            0,
            "m".into(),
            Vec::new(),
            Usage::default(),
        );
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].message.content, "");
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert_eq!(resp.choices[0].message.role, Role::Assistant);
    }

    #[test]
    fn test_usage_total() {
        assert_eq!(Usage::new(3, 4, None).total_tokens, 7);
        assert_eq!(Usage::new(3, 4, Some(10)).total_tokens, 10);
        assert_eq!(Usage::new(u64::MAX, 1, None).total_tokens, u64::MAX);
    }

    #[test]
    fn test_completion_id_format() {
        let id = generate_completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_eq!(id.len(), "chatcmpl-".len() + 12);
        assert!(id["chatcmpl-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_completion_id());
    }
}
