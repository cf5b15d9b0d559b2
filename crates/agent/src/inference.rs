//! Hosted model inference behind a small trait so the classifier can be
//! exercised with in-process fakes.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use vlog_core::config::ClassifierConfig;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference credentials are not configured")]
    MissingCredentials,
    #[error("inference request failed: {0}")]
    Transport(String),
    #[error("inference endpoint returned status {status}")]
    Status { status: u16 },
    #[error("could not decode inference response: {0}")]
    Decode(String),
}

/// One token-classification entity. Aggregated responses carry
/// `entity_group` ("PER"); raw ones carry `entity` ("B-PER").
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TokenEntity {
    #[serde(alias = "entity")]
    pub entity_group: String,
    pub word: String,
    #[serde(default)]
    pub score: f64,
}

impl TokenEntity {
    /// Entity kind without the IOB prefix.
    pub fn kind(&self) -> &str {
        let group = self.entity_group.as_str();
        group.strip_prefix("B-").or_else(|| group.strip_prefix("I-")).unwrap_or(group)
    }
}

/// Zero-shot labels ordered by descending score.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZeroShotResult {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl ZeroShotResult {
    pub fn top(&self) -> Option<(&str, f64)> {
        Some((self.labels.first()?.as_str(), *self.scores.first()?))
    }
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn token_classification(
        &self,
        model: &str,
        text: &str,
    ) -> Result<Vec<TokenEntity>, InferenceError>;

    /// Returns only the generated continuation, not the prompt.
    async fn text_generation(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;

    async fn zero_shot(
        &self,
        model: &str,
        text: &str,
        labels: &[&str],
    ) -> Result<ZeroShotResult, InferenceError>;
}

pub const GENERATION_STOP_SEQUENCES: [&str; 6] =
    ["\n\n", "Location:", "Activity:", "Kids:", "Organization:", "Date:"];

pub struct HuggingFaceBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl HuggingFaceBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(InferenceError::MissingCredentials);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InferenceError::Transport(error.to_string()))?;

        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), api_key })
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self, InferenceError> {
        let api_key = config.api_key.clone().ok_or(InferenceError::MissingCredentials)?;
        Self::new(&config.base_url, api_key, Duration::from_secs(config.timeout_secs))
    }

    async fn post(&self, model: &str, body: Value) -> Result<Value, InferenceError> {
        let url = format!("{}/models/{}", self.base_url, model.trim_matches('/'));
        debug!(event_name = "inference.request", model, "posting inference request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| InferenceError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(InferenceError::Status { status: response.status().as_u16() });
        }

        response.json::<Value>().await.map_err(|error| InferenceError::Decode(error.to_string()))
    }
}

#[async_trait]
impl InferenceBackend for HuggingFaceBackend {
    async fn token_classification(
        &self,
        model: &str,
        text: &str,
    ) -> Result<Vec<TokenEntity>, InferenceError> {
        let payload = self
            .post(model, json!({ "inputs": text, "parameters": { "aggregation_strategy": "simple" } }))
            .await?;
        serde_json::from_value(payload).map_err(|error| InferenceError::Decode(error.to_string()))
    }

    async fn text_generation(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let payload = self
            .post(
                model,
                json!({
                    "inputs": prompt,
                    "parameters": {
                        "max_new_tokens": 100,
                        "temperature": 0.1,
                        "return_full_text": false,
                        "stop": GENERATION_STOP_SEQUENCES,
                    }
                }),
            )
            .await?;
        parse_generated_text(&payload)
    }

    async fn zero_shot(
        &self,
        model: &str,
        text: &str,
        labels: &[&str],
    ) -> Result<ZeroShotResult, InferenceError> {
        let payload = self
            .post(model, json!({ "inputs": text, "parameters": { "candidate_labels": labels } }))
            .await?;
        parse_zero_shot(&payload)
    }
}

/// Accepts `[{"generated_text": ..}]` and `{"generated_text": ..}`.
pub fn parse_generated_text(payload: &Value) -> Result<String, InferenceError> {
    let entry = match payload {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    entry
        .and_then(|entry| entry.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InferenceError::Decode("missing generated_text".to_string()))
}

/// Accepts the `{labels, scores}` object (optionally wrapped in an array)
/// and the `[{label, score}, ..]` list.
pub fn parse_zero_shot(payload: &Value) -> Result<ZeroShotResult, InferenceError> {
    #[derive(Deserialize)]
    struct Columns {
        labels: Vec<String>,
        scores: Vec<f64>,
    }

    #[derive(Deserialize)]
    struct Scored {
        label: String,
        score: f64,
    }

    let columns = match payload {
        Value::Array(items) if items.first().is_some_and(|item| item.get("labels").is_some()) => {
            items.first().cloned()
        }
        Value::Object(_) => Some(payload.clone()),
        _ => None,
    };

    if let Some(columns) = columns {
        let Columns { labels, scores } = serde_json::from_value(columns)
            .map_err(|error| InferenceError::Decode(error.to_string()))?;
        if labels.len() != scores.len() {
            return Err(InferenceError::Decode("labels and scores differ in length".to_string()));
        }
        return Ok(ZeroShotResult { labels, scores });
    }

    let mut scored: Vec<Scored> = serde_json::from_value(payload.clone())
        .map_err(|error| InferenceError::Decode(error.to_string()))?;
    scored.sort_by(|left, right| right.score.total_cmp(&left.score));

    Ok(ZeroShotResult {
        labels: scored.iter().map(|entry| entry.label.clone()).collect(),
        scores: scored.iter().map(|entry| entry.score).collect(),
    })
}
