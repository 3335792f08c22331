//! Answer generation providers.
//!
//! A [`Generator`] turns a grounded prompt into answer text. The answer
//! synthesizer treats it as a black box: prompt in, text out, or failure.
//!
//! - **[`DisabledGenerator`]**: the gate is closed; answers use retrieval only.
//! - **[`OpenAiGenerator`]**: OpenAI-compatible chat completions with retry and backoff.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GenerationConfig;

const SYSTEM_PROMPT: &str = "You are an expert on this code repository. Answer the question \
using only the provided repository context. Cite file paths when relevant and say so when \
the context does not contain the answer.";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider identifier (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// The "has key" gate. When false the synthesizer never calls [`Generator::generate`].
    fn is_configured(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Provider used when generation is disabled or has no key.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Answer generation is disabled")
    }
}

/// Chat-completions client for OpenAI and compatible endpoints.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_retries: u32,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Create a generator reading the key from `generation.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not set or the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(attempt, delay_secs = delay.as_secs(), "retrying generation");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Generation API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429): don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Generation API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

/// Extract `choices[0].message.content`, trimmed. Empty content is an error.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing choices[0].message.content"))?
        .trim();
    if content.is_empty() {
        bail!("Completion response was empty");
    }
    Ok(content.to_string())
}

/// Create the [`Generator`] selected by `generation.provider`.
///
/// | Config Value | Generator |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledGenerator`] |
/// | `"openai"` | [`OpenAiGenerator`], or [`DisabledGenerator`] when the key is absent |
///
/// # Errors
///
/// Returns an error for unknown provider names.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    if !config.is_enabled() {
        return Ok(Box::new(DisabledGenerator));
    }
    match config.provider.as_str() {
        "openai" => match OpenAiGenerator::new(config) {
            Ok(g) => Ok(Box::new(g)),
            Err(e) => {
                info!("{}; answers will use retrieval only", e);
                Ok(Box::new(DisabledGenerator))
            }
        },
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_choice() {
        let json = json!({"choices": [{"message": {"role": "assistant", "content": "  Stripe handles it.\n"}}]});
        assert_eq!(parse_completion(&json).unwrap(), "Stripe handles it.");
    }

    #[test]
    fn empty_or_missing_content_is_an_error() {
        assert!(parse_completion(&json!({"choices": []})).is_err());
        assert!(parse_completion(&json!({"choices": [{"message": {"content": "  "}}]})).is_err());
    }

    #[test]
    fn disabled_by_default() {
        let g = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(g.name(), "disabled");
        assert!(!g.is_configured());
    }

    #[test]
    fn openai_without_key_closes_the_gate() {
        let config = GenerationConfig {
            provider: "openai".to_string(),
            api_key_env: "REPO_LENS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let g = create_generator(&config).unwrap();
        assert!(!g.is_configured());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = GenerationConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[tokio::test]
    async fn disabled_generate_fails() {
        assert!(DisabledGenerator.generate("hi").await.is_err());
    }
}
