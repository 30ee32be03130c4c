//! Language-model client abstraction
//!
//! One operation, `complete(prompt, temperature, max_output_tokens)`, used for
//! both query decomposition and answer synthesis. The default implementation
//! speaks the OpenAI-compatible chat completions protocol (Groq by default).

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::retry::with_retry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait for text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt and return the generated text
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: usize) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
    timeout: Duration,
}

impl ChatCompletionsClient {
    /// Create a new client; an API key is required
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "llm.api_key (or GROQ_API_KEY) is not set".to_string(),
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            max_retries: config.max_retries,
            timeout,
        })
    }

    async fn call(&self, prompt: &str, temperature: f32, max_tokens: usize) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ModelTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::HttpClient(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "chat completions".to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::ModelError {
            message: format!("Failed to parse response: {}", e),
        })?;

        extract_content(chat_response)
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AppError::ModelError {
            message: "Empty response from model".to_string(),
        })
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: usize) -> Result<String> {
        let start = Instant::now();
        let outcome = with_retry("chat completions", self.max_retries, || {
            self.call(prompt, temperature, max_tokens)
        })
        .await;

        metrics::record_model_call(start.elapsed().as_secs_f64(), &self.model, outcome.is_ok());
        outcome
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
