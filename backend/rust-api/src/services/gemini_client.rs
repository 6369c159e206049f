use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::AssessmentConfig;

/// Text generation backend for the coach assessment.
#[async_trait]
pub trait AssessmentClient: Send + Sync {
    async fn generate_assessment(&self, prompt: &str) -> Result<String>;
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &AssessmentConfig, api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Gemini client when a key is configured, otherwise a client that
    /// always errors so callers serve their fallback.
    pub fn from_config(config: &AssessmentConfig) -> Result<Box<dyn AssessmentClient>> {
        match &config.api_key {
            Some(key) => Ok(Box::new(Self::new(config, key.clone())?)),
            None => Ok(Box::new(DisabledAssessmentClient)),
        }
    }
}

#[async_trait]
impl AssessmentClient for GeminiClient {
    async fn generate_assessment(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to call Gemini API")?;

        if !response.status().is_success() {
            anyhow::bail!("Gemini API returned status: {}", response.status());
        }

        let body: serde_json::Value = response.json().await?;
        extract_text(&body)
    }
}

fn extract_text(body: &serde_json::Value) -> Result<String> {
    let text = body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| anyhow!("Invalid response format"))?
        .trim();

    if text.is_empty() {
        anyhow::bail!("Gemini returned an empty assessment");
    }
    Ok(text.to_string())
}

pub struct DisabledAssessmentClient;

#[async_trait]
impl AssessmentClient for DisabledAssessmentClient {
    async fn generate_assessment(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("Assessment model is not configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "  Keep going!\n" }] } }]
        });
        assert_eq!(extract_text(&body).unwrap(), "Keep going!");
    }

    #[test]
    fn test_extract_text_rejects_unexpected_shapes() {
        assert!(extract_text(&json!({ "candidates": [] })).is_err());
        assert!(extract_text(&json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        }))
        .is_err());
    }

    #[tokio::test]
    async fn test_disabled_client_always_errors() {
        let client = DisabledAssessmentClient;
        assert!(client.generate_assessment("anything").await.is_err());
    }
}
