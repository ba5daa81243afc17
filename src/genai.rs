//! Generative-AI service client.
//!
//! Single-turn prompt completion against the Gemini `generateContent` REST
//! endpoint. Requires the `GOOGLE_API_KEY` environment variable.
//!
//! Retries follow the same strategy as the sheets client: 429/5xx/network
//! errors back off exponentially (1s, 2s, 4s, ... capped at 2^5); other 4xx
//! responses fail immediately.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use crate::config::ModelConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    model: String,
    timeout: Duration,
    max_retries: u32,
    temperature: f64,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or when `GOOGLE_API_KEY`
    /// is not in the environment.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        match config.provider.as_str() {
            "gemini" => {}
            other => bail!("Unknown model provider: '{}'. Only gemini is supported.", other),
        }

        if std::env::var("GOOGLE_API_KEY").is_err() {
            bail!("GOOGLE_API_KEY environment variable not set");
        }

        Ok(Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            temperature: config.temperature,
        })
    }

    /// Send a constructed prompt and return the model's free-text answer.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow!("GOOGLE_API_KEY not set"))?;

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_generate_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("Gemini API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Gemini request failed after retries")))
    }
}

/// Extract the answer text from a `generateContent` response.
///
/// Joins the text parts of the first candidate. A response with no
/// candidates (e.g. blocked by safety settings) is an error.
pub fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: no candidates returned"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        bail!("Gemini returned an empty answer (the response may have been blocked)");
    }

    Ok(text)
}
