use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::models::Turn;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TOP_P: f32 = 1.0;

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;
pub type ListModelsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ModelDescriptor>, LlmError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Turn>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            stream: false,
        }
    }

    pub fn with_decode(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("chat provider request timed out")]
    Timeout,
    #[error("chat provider request failed: {0}")]
    ProviderFailure(String),
    #[error("chat provider returned an invalid payload: {0}")]
    InvalidPayload(String),
}

pub trait ChatGateway: Send + Sync {
    fn chat<'a>(&'a self, request: ChatRequest) -> ChatFuture<'a>;
    fn list_models<'a>(&'a self) -> ListModelsFuture<'a>;
}
