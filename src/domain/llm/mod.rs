//! LLM provider domain models and traits

mod message;
mod provider;
mod request;
mod response;

pub use message::{Message, MessageRole};
pub use provider::LlmProvider;
pub use request::{LlmRequest, LlmRequestBuilder, ResponseFormat};
pub use response::LlmResponse;

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
