// Ollama /api/generate client (non-streaming)
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TextGenerator;
use crate::config::GenerationConfig;
use crate::error::GenerationError;

#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

impl OllamaClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport {
                url: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Same server and settings, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self.endpoint();
        debug!("POST {} model={} prompt_chars={}", url, self.model, prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Transport {
                        url: url.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| GenerationError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(GenerationError::Remote {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_response(&body)
    }
}

/// Pull the generated text out of a non-streaming response body.
fn parse_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Decode(e.to_string()))?;

    match (parsed.response, parsed.error) {
        (Some(text), _) => Ok(text),
        (None, Some(error)) => Err(GenerationError::Decode(error)),
        (None, None) => Err(GenerationError::Decode("response field missing".to_string())),
    }
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GenerateResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> GenerationConfig {
        GenerationConfig {
            base_url: base_url.to_string(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn test_request_body_disables_streaming() {
        let client = OllamaClient::new(&config("http://localhost:11434/")).unwrap();
        let body = serde_json::to_value(client.request_body("Question?")).unwrap();

        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "Question?");
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_parse_response() {
        let text = parse_response(r#"{"model":"llama3","response":"42 dollars","done":true}"#).unwrap();
        assert_eq!(text, "42 dollars");
    }

    #[test]
    fn test_missing_response_is_decode_error() {
        let err = parse_response(r#"{"done":true}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Decode(_)));

        let err = parse_response("not json").unwrap_err();
        assert!(matches!(err, GenerationError::Decode(_)));
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":"model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn test_with_model_keeps_server() {
        let client = OllamaClient::new(&config("http://gpu-box:11434")).unwrap();
        let mistral = client.with_model("mistral");
        assert_eq!(mistral.model(), "mistral");
        assert_eq!(mistral.endpoint(), client.endpoint());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // port 9 (discard) is closed on test machines
        let client = OllamaClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(
            matches!(err, GenerationError::Transport { .. } | GenerationError::Timeout(_)),
            "{:?}",
            err
        );
        assert_eq!(err.status(), None);
    }
}
