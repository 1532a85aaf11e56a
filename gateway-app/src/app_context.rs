use crate::application::CompleteChat;
use crate::config::Settings;
use crate::infrastructure::llm::LlmClient;
use gateway_errors::AppError;
use std::sync::Arc;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppContext {
    pub complete_chat: Arc<CompleteChat>,
    pub settings: Arc<Settings>,
}

impl AppContext {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let client = Arc::new(LlmClient::new(&settings)?);
        Ok(Self {
            complete_chat: Arc::new(CompleteChat::new(client)),
            settings: Arc::new(settings),
        })
    }
}
