use crate::domain::{ChatCompletionRequest, ChatCompletionResponse};
use crate::infrastructure::llm::LlmClient;
use gateway_errors::AppError;
use std::sync::Arc;

pub struct CompleteChat {
    client: Arc<LlmClient>,
}

impl CompleteChat {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }

    /// Runs one translation. Unsupported requests fail before any upstream I/O.
    pub async fn execute(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AppError> {
        req.ensure_supported()?;

        tracing::debug!(
            backend = %self.client.backend(),
            model = %req.model,
            messages = req.messages.len(),
            "Dispatching chat completion"
        );
        self.client.chat_completion(req).await
    }
}
