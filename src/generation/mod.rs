//! Chat-model providers that turn an assembled prompt into an answer.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

mod anthropic;
mod cohere;
mod openai;

pub use anthropic::AnthropicProvider;
pub use cohere::CohereProvider;
pub use openai::OpenAiProvider;

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider {
    /// Sends one request and returns the model's text.
    fn answer(&self, request: &ProviderRequest) -> Result<String>;
}

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    /// System instructions.
    pub system: &'a str,
    /// User turn.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: usize,
}

/// Supported chat providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Cohere chat API.
    Cohere,
    /// OpenAI chat completions.
    #[value(name = "openai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
}

impl ProviderKind {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Cohere => "command-r-plus",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    /// Environment variable holding the credential.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Cohere => "COHERE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Chat provider selection and sampling settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Provider to call.
    pub provider: ProviderKind,
    /// Model name; the provider default when `None`.
    pub model: Option<String>,
    /// Provider credential.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Cohere,
            model: None,
            api_key: None,
            temperature: 0.3,
            max_tokens: 256,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationConfig {
    /// Effective model name.
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Builds the configured provider.
    pub fn build(&self) -> Result<Box<dyn LlmProvider>> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| {
                format!(
                    "{} must be set for the {:?} chat provider",
                    self.provider.api_key_env(),
                    self.provider
                )
            })?;
        let model = self.model_name().to_string();
        log::info!("using chat model {model}");
        let provider: Box<dyn LlmProvider> = match self.provider {
            ProviderKind::Cohere => Box::new(CohereProvider::new(api_key, model, self.timeout)?),
            ProviderKind::OpenAi => Box::new(OpenAiProvider::new(api_key, model, self.timeout)?),
            ProviderKind::Anthropic => {
                Box::new(AnthropicProvider::new(api_key, model, self.timeout)?)
            }
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_key_names_the_variable() {
        let config = GenerationConfig {
            provider: ProviderKind::Anthropic,
            ..GenerationConfig::default()
        };
        let err = config.build().err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn default_chat_model() {
        assert_eq!(GenerationConfig::default().model_name(), "command-r-plus");
    }
}
