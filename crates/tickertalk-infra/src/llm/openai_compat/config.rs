//! Per-provider defaults for OpenAI-compatible providers.

use async_openai::config::{AzureConfig, OpenAIConfig};
use secrecy::ExposeSecret;

use tickertalk_types::llm::ProviderCapabilities;

use crate::config::AzureSettings;

/// GPT-4o limits: 128K context, 16K output.
pub fn gpt4o_capabilities() -> ProviderCapabilities {
    ProviderCapabilities {
        streaming: true,
        max_context_tokens: 128_000,
        max_output_tokens: 16_384,
    }
}

/// Azure client configuration routed to one deployment.
pub fn azure_config(settings: &AzureSettings) -> AzureConfig {
    AzureConfig::new()
        .with_api_base(settings.endpoint.trim_end_matches('/'))
        .with_api_version(&settings.api_version)
        .with_deployment_id(&settings.deployment)
        .with_api_key(settings.api_key.expose_secret())
}

/// OpenAI client configuration against `https://api.openai.com/v1`.
pub fn openai_config(api_key: &str) -> OpenAIConfig {
    OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base("https://api.openai.com/v1")
}
