//! LLM provider abstractions for TickerTalk.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `CompletionSettings`: model parameters shared by every request

pub mod box_provider;
pub mod provider;

#[cfg(test)]
pub(crate) mod fake;

use tickertalk_types::config::LlmConfig;
use tickertalk_types::llm::{CompletionRequest, Message, MessageRole};

/// Model parameters applied to every completion request.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for CompletionSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl CompletionSettings {
    /// Build a request. A leading system message is lifted into `system`.
    pub fn request(&self, mut messages: Vec<Message>, stream: bool) -> CompletionRequest {
        let system = match messages.first() {
            Some(first) if first.role == MessageRole::System => Some(messages.remove(0).content),
            _ => None,
        };
        CompletionRequest {
            model: self.model.clone(),
            messages,
            system,
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            stream,
            stop_sequences: None,
        }
    }
}

/// Rough token estimate: four characters per token.
pub fn approx_tokens(text: &str) -> usize {
    text.len() / 4
}
