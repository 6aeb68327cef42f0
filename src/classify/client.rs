//! The model collaborator: one prompt in, one answer out.

use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{Result, SiftError};

/// Longest error body kept in a [`SiftError::Status`].
const ERROR_BODY_CHARS: usize = 500;

/// Anything that can turn a prompt into an answer.
///
/// Called at most once per message; implementations must not retry.
pub trait ModelCaller {
    fn call(&self, prompt: &str) -> Result<String>;
}

impl<F> ModelCaller for F
where
    F: Fn(&str) -> Result<String>,
{
    fn call(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Blocking client for an OpenAI-compatible chat completions endpoint (OpenRouter by default).
pub struct OpenRouterClient {
    http: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    referer: String,
    api_key: SecretString,
}

impl OpenRouterClient {
    /// Build a client from the model settings and an API key.
    pub fn new(config: &ModelConfig, api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(SiftError::MissingCredential(crate::config::API_KEY_ENV));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SiftError::Config(format!("HTTP client: {e}")))?;

        Ok(Self::with_http(http, config, api_key))
    }

    fn with_http(http: Client, config: &ModelConfig, api_key: SecretString) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            referer: config.referer.clone(),
            api_key,
        }
    }

    /// The model identifier requests are sent with.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ModelCaller for OpenRouterClient {
    fn call(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.max_tokens,
        });

        info!(endpoint = %self.endpoint, model = %self.model, "Calling model");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("HTTP-Referer", &self.referer)
            .json(&payload)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SiftError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let json: Value = response.json()?;
        let text = completion_text(&json).ok_or_else(|| {
            SiftError::AnswerParse("response has no choices[0].message.content".into())
        })?;
        debug!(chars = text.len(), "Model answered");
        Ok(text)
    }
}

/// Pull the answer text out of a chat completions response.
fn completion_text(json: &Value) -> Option<String> {
    json.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}
