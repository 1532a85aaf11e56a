mod complete_chat;

pub use complete_chat::CompleteChat;
