use std::env;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use super::gateway::{
    ChatFuture, ChatGateway, ChatRequest, ListModelsFuture, LlmError, ModelDescriptor,
};

const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODELS_URL: &str = "https://api.groq.com/openai/v1/models";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct GroqGatewayConfig {
    pub chat_completions_url: String,
    pub models_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl GroqGatewayConfig {
    pub fn from_env() -> Result<Self, GroqConfigError> {
        let api_key = require_non_empty_env("GROQ_API_KEY")?;
        let chat_completions_url = optional_trimmed_env("GROQ_CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| DEFAULT_CHAT_COMPLETIONS_URL.to_string());
        let models_url = optional_trimmed_env("GROQ_MODELS_URL")
            .unwrap_or_else(|| DEFAULT_MODELS_URL.to_string());
        for (key, url) in [
            ("GROQ_CHAT_COMPLETIONS_URL", chat_completions_url.as_str()),
            ("GROQ_MODELS_URL", models_url.as_str()),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GroqConfigError::InvalidConfiguration(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }

        Ok(Self {
            chat_completions_url,
            models_url,
            api_key,
            timeout_ms: parse_u64_env("GROQ_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_retries: parse_u32_env("GROQ_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_base_backoff_ms: parse_u64_env(
                "GROQ_RETRY_BASE_BACKOFF_MS",
                DEFAULT_RETRY_BASE_BACKOFF_MS,
            )?,
        })
    }
}

#[derive(Debug, Error)]
pub enum GroqConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build chat provider http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct GroqGateway {
    client: reqwest::Client,
    config: GroqGatewayConfig,
}

impl GroqGateway {
    pub fn new(config: GroqGatewayConfig) -> Result<Self, GroqConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| GroqConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn chat_with_retry(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let mut attempt = 0_u32;

        loop {
            match self.chat_once(request).await {
                Ok(answer) => return Ok(answer),
                Err(err) => {
                    if err.retryable && attempt < self.config.max_retries {
                        let backoff_multiplier = 2_u64.saturating_pow(attempt);
                        let backoff_ms = self
                            .config
                            .retry_base_backoff_ms
                            .saturating_mul(backoff_multiplier);
                        debug!(
                            attempt,
                            backoff_ms, "retrying chat completion after transient failure"
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                        attempt = attempt.saturating_add(1);
                        continue;
                    }

                    return Err(err.error);
                }
            }
        }
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<String, SendAttemptError> {
        let request_body = json!({
            "model": request.model,
            "messages": request
                .messages
                .iter()
                .map(|turn| json!({ "role": turn.role, "content": turn.content }))
                .collect::<Vec<_>>(),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "top_p": request.top_p,
            "stream": request.stream,
        });

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SendAttemptError::retryable(LlmError::Timeout)
                } else {
                    SendAttemptError::retryable(LlmError::ProviderFailure(
                        "request_unavailable".to_string(),
                    ))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            SendAttemptError::non_retryable(LlmError::InvalidPayload(
                "response_body_read_failed".to_string(),
            ))
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            return Err(SendAttemptError {
                error: LlmError::ProviderFailure(format!(
                    "status={} code={provider_code}",
                    status.as_u16()
                )),
                retryable: is_retryable_status(status),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|_| {
            SendAttemptError::non_retryable(LlmError::InvalidPayload(
                "response_json_parse_failed".to_string(),
            ))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                SendAttemptError::non_retryable(LlmError::InvalidPayload(
                    "missing_choice".to_string(),
                ))
            })?
            .message
            .content;

        Ok(content)
    }

    async fn list_models_once(&self) -> Result<Vec<ModelDescriptor>, LlmError> {
        let response = self
            .client
            .get(&self.config.models_url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            LlmError::InvalidPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            return Err(LlmError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            )));
        }

        let parsed: ModelListResponse = serde_json::from_str(&body).map_err(|_| {
            LlmError::InvalidPayload("response_json_parse_failed".to_string())
        })?;

        Ok(parsed
            .data
            .into_iter()
            .map(|model| ModelDescriptor { id: model.id })
            .collect())
    }
}

impl ChatGateway for GroqGateway {
    fn chat<'a>(&'a self, request: ChatRequest) -> ChatFuture<'a> {
        Box::pin(async move { self.chat_with_retry(&request).await })
    }

    fn list_models<'a>(&'a self) -> ListModelsFuture<'a> {
        Box::pin(async move { self.list_models_once().await })
    }
}

#[derive(Debug)]
struct SendAttemptError {
    error: LlmError,
    retryable: bool,
}

impl SendAttemptError {
    fn retryable(error: LlmError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn non_retryable(error: LlmError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    id: String,
}

fn require_non_empty_env(key: &str) -> Result<String, GroqConfigError> {
    let value = env::var(key).map_err(|_| GroqConfigError::MissingVar(key.to_string()))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GroqConfigError::MissingVar(key.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, GroqConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| GroqConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32, GroqConfigError> {
    match optional_trimmed_env(key) {
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| GroqConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok();
    let Some(provider_error_code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match provider_error_code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}
