mod backend;
mod client;
mod normalize;
pub mod ollama;
pub mod openai;

pub use backend::BackendKind;
pub use client::LlmClient;
