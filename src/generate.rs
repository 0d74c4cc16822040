//! Answer generation abstraction and implementations.
//!
//! Defines the [`AnswerGenerator`] trait and two interchangeable backends:
//! - **[`GeminiGenerator`]** — calls the hosted Gemini generateContent API.
//! - **[`OllamaGenerator`]** — runs a local model through Ollama with a
//!   bounded output length.
//!
//! Exactly one backend is selected at startup from `generation.use_api`;
//! there is no runtime switching and no fallback between them. Provider
//! errors (network, auth, rate limits) are surfaced once, never retried.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;

/// Generates text from a rendered prompt. May block on network or local
/// compute for the duration of the configured timeout.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the configured [`AnswerGenerator`].
///
/// The hosted variant requires `GEMINI_API_KEY` in the environment; a missing
/// key is a startup-time fatal error.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn AnswerGenerator>> {
    if config.use_api {
        println!("Using Gemini API model");
        Ok(Box::new(GeminiGenerator::new(config)?))
    } else {
        println!("Using local Ollama model");
        Ok(Box::new(OllamaGenerator::new(config)?))
    }
}

// ============ Gemini (hosted API) ============

/// Hosted generation via `POST models/{model}:generateContent` on the
/// Generative Language API.
pub struct GeminiGenerator {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .api_model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.api_model required for the API variant"))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_gemini_response(&json)
    }
}

/// Extract the first candidate's text from a generateContent response.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    json.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.pointer("/content/parts/0/text"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: no candidate text"))
}

// ============ Ollama (local model) ============

/// Local generation via `POST /api/generate` on an Ollama instance, with
/// output capped at `max_output_tokens`.
pub struct OllamaGenerator {
    model: String,
    url: String,
    max_output_tokens: usize,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config.local_model.clone().ok_or_else(|| {
            anyhow::anyhow!("generation.local_model required for the local variant")
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            url,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": self.max_output_tokens },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(|r| r.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }
}
