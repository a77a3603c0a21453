//! Advisory text service
//!
//! Asks a Gemini model for a one or two sentence note about the value that
//! was just sent. Best effort: every failure is logged and yields `None`.

use crate::domain::settings::AdvisorySettings;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Credentials handed to the advisory client at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryCredentials {
    ApiKey(String),
    Missing,
}

impl AdvisoryCredentials {
    pub fn from_key(key: Option<String>) -> Self {
        match key {
            Some(key) if !key.trim().is_empty() => Self::ApiKey(key.trim().to_string()),
            _ => Self::Missing,
        }
    }
}

#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn describe(&self, value: f64) -> Option<String>;
}

/// Used when the advisory is turned off in settings
pub struct DisabledAdvisor;

#[async_trait]
impl AdvisoryService for DisabledAdvisor {
    async fn describe(&self, _value: f64) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
enum AdvisoryError {
    #[error("no API key configured")]
    MissingKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("response contained no text")]
    Empty,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

pub struct GeminiAdvisor {
    client: reqwest::Client,
    credentials: AdvisoryCredentials,
    settings: AdvisorySettings,
}

impl GeminiAdvisor {
    pub fn new(
        credentials: AdvisoryCredentials,
        settings: AdvisorySettings,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
            settings,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn generate(&self, value: f64) -> Result<String, AdvisoryError> {
        let AdvisoryCredentials::ApiKey(key) = &self.credentials else {
            return Err(AdvisoryError::MissingKey);
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&build_request(value))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Status(response.status()));
        }

        let body: GenerateResponse = response.json().await?;
        extract_text(body).ok_or(AdvisoryError::Empty)
    }
}

#[async_trait]
impl AdvisoryService for GeminiAdvisor {
    async fn describe(&self, value: f64) -> Option<String> {
        match self.generate(value).await {
            Ok(text) => Some(text),
            Err(AdvisoryError::MissingKey) => {
                debug!("Advisory skipped: no API key configured");
                None
            }
            Err(e) => {
                error!("Advisory error: {}", e);
                None
            }
        }
    }
}

pub fn prompt(value: f64) -> String {
    format!(
        "The user just selected the value {} on an industrial-style controller. \
         Briefly explain what this value might represent in different contexts \
         (like frequency, power, scale, or speed). Keep it very short, 1-2 sentences.",
        value
    )
}

fn build_request(value: f64) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(prompt(value)),
            }],
        }],
        generation_config: GenerationConfig {
            thinking_config: ThinkingConfig { thinking_budget: 0 },
        },
    }
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
