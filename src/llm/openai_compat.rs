//! Client for OpenAI-compatible HTTP APIs (Groq, OpenAI, LM Studio, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::{EmbeddingConfig, LlmConfig};
use crate::core::errors::RagError;

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: api_key_env.into(),
            client,
        })
    }

    /// Chat client for the configured LLM. The key is captured now; a missing
    /// key only fails when a request is made.
    pub fn from_llm_config(config: &LlmConfig) -> Result<Self, RagError> {
        Self::new(
            config.provider.clone(),
            &config.base_url,
            config.resolve_api_key(),
            config.api_key_env.clone(),
            config.request_timeout(),
        )
    }

    pub fn from_embedding_config(
        config: &EmbeddingConfig,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        Self::new(
            "embeddings",
            &config.base_url,
            config.resolve_api_key(),
            config.api_key_env.clone(),
            timeout,
        )
    }

    fn api_key(&self) -> Result<&str, RagError> {
        self.api_key.as_deref().ok_or_else(|| {
            RagError::Configuration(format!(
                "no API key for {}: set the {} environment variable",
                self.name, self.api_key_env
            ))
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, RagError> {
        let url = format!("{}{}", self.base_url, path);
        let api_key = self.api_key()?;

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::Network(format!("{} request timed out: {}", self.name, e))
                } else {
                    RagError::network(e)
                }
            })?;

        let res = self.check_status(res).await?;
        res.json::<Value>()
            .await
            .map_err(|e| RagError::Protocol(format!("{} returned invalid JSON: {}", self.name, e)))
    }

    async fn check_status(&self, res: Response) -> Result<Response, RagError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        let detail = error_detail(&text);
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                RagError::Authentication(format!("{} rejected the API key: {}", self.name, detail))
            }
            StatusCode::NOT_FOUND => {
                RagError::Configuration(format!("{} model or endpoint not found: {}", self.name, detail))
            }
            StatusCode::BAD_REQUEST if detail.to_lowercase().contains("model") => {
                RagError::Configuration(format!("{} rejected the model: {}", self.name, detail))
            }
            _ => RagError::Network(format!("{} returned {}: {}", self.name, status, detail)),
        })
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, else the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, RagError> {
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }

        let payload = self.post_json("/v1/chat/completions", &body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::Protocol(format!(
                    "{} response has no choices[0].message.content",
                    self.name
                ))
            })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let payload = self.post_json("/v1/embeddings", &body).await?;

        let data = payload["data"].as_array().ok_or_else(|| {
            RagError::Protocol(format!("{} embeddings response has no data array", self.name))
        })?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"].as_array().ok_or_else(|| {
                RagError::Protocol(format!("{} embedding entry has no vector", self.name))
            })?;
            let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
            embeddings.push(vec);
        }

        Ok(embeddings)
    }
}
