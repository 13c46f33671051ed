//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](tickertalk_core::llm::provider::LlmProvider)
//! for OpenAI-compatible APIs, plus a factory ([`create_provider`]) that
//! builds the boxed Azure provider from configuration.

pub mod openai_compat;

use std::time::Duration;

use tickertalk_core::llm::box_provider::BoxLlmProvider;
use tickertalk_types::config::LlmConfig;

use self::openai_compat::OpenAiCompatibleProvider;
use crate::config::AzureSettings;

/// Create a [`BoxLlmProvider`] for the configured Azure deployment.
pub fn create_provider(settings: &AzureSettings, config: &LlmConfig) -> BoxLlmProvider {
    let provider = OpenAiCompatibleProvider::azure(
        settings,
        &config.model,
        Duration::from_secs(config.timeout_secs),
    );
    tracing::info!(
        provider = "azure_openai",
        deployment = %settings.deployment,
        model = %config.model,
        "LLM provider created"
    );
    BoxLlmProvider::new(provider)
}
