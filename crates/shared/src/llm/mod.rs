pub mod gateway;
pub mod groq;

pub use gateway::{
    ChatFuture, ChatGateway, ChatRequest, ListModelsFuture, LlmError, ModelDescriptor,
};
pub use groq::{GroqConfigError, GroqGateway, GroqGatewayConfig};
