//! LLM providers used by narrative synthesis.
//!
//! Supports:
//! - **Anthropic** via rig-core
//! - **OpenAI** via rig-core
//!
//! rig-core handles the HTTP transport; `RigAdapter` bridges its
//! `CompletionModel` to our `LlmProvider`. The pipeline never depends on a
//! concrete provider; tests plug in stubs.

mod costs;
pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Build config from environment variables.
    ///
    /// Returns `None` when neither `ANTHROPIC_API_KEY` nor `OPENAI_API_KEY`
    /// is set; the pipeline then runs rule-based synthesis only.
    pub fn from_env() -> Option<Self> {
        let model = std::env::var("BRIEF_MODEL").ok();

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Some(Self {
                backend: LlmBackend::Anthropic,
                api_key: SecretString::from(key),
                model: model.unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
            });
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Some(Self {
                backend: LlmBackend::OpenAi,
                api_key: SecretString::from(key),
                model: model.unwrap_or_else(|| "gpt-4o".to_string()),
            });
        }

        None
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if config.model.trim().is_empty() {
        return Err(LlmError::RequestFailed {
            provider: format!("{:?}", config.backend).to_lowercase(),
            reason: "model name is empty".to_string(),
        });
    }

    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}
