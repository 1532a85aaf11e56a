mod chat;

pub use chat::{
    generate_completion_id, ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    ChoiceMessage, Role, Usage, CHAT_COMPLETION_OBJECT, DEFAULT_FINISH_REASON,
};
