//! LlmProvider trait definition.
//!
//! The chat-completion port. Uses RPITIT for `complete` and `count_tokens`,
//! and `Pin<Box<dyn Stream>>` for `stream` (streams need to be object-safe
//! for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use tickertalk_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent, TokenCount,
};

/// Trait for chat-completion backends (Azure OpenAI, OpenAI, ...).
///
/// Implementations live in tickertalk-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "azure_openai").
    fn name(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request.
    ///
    /// The returned stream yields text increments in production order and
    /// is restartable per call only.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

    /// Estimate the tokens in a request without sending it.
    fn count_tokens(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<TokenCount, LlmError>> + Send;
}
