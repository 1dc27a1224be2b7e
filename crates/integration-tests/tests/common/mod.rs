use std::collections::VecDeque;
use std::sync::Mutex;

use shared::config::Config;
use shared::llm::{
    ChatFuture, ChatGateway, ChatRequest, ListModelsFuture, LlmError, ModelDescriptor,
};

// A search endpoint nothing listens on: every fetch fails fast and the
// extractor takes its apology path, keeping tests offline.
pub const DEAD_SEARCH_ENDPOINT: &str = "http://127.0.0.1:9/search";

pub fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        user_name: "Casey".to_string(),
        assistant_name: "Friday".to_string(),
        chat_log_path: dir.path().join("chat_log.json"),
        search_endpoint: DEAD_SEARCH_ENDPOINT.to_string(),
    }
}

// Chat replies are consumed in order; the catalog answer is fixed. Every
// chat request is captured for assertions on model and decode parameters.
pub struct MockGateway {
    replies: Mutex<VecDeque<Result<String, String>>>,
    catalog: Result<Vec<String>, String>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
}

impl MockGateway {
    pub fn new(
        replies: Vec<Result<&str, &str>>,
        catalog: Result<Vec<&str>, &str>,
    ) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            catalog: catalog
                .map(|ids| ids.into_iter().map(str::to_string).collect())
                .map_err(str::to_string),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn chat_request(&self, index: usize) -> ChatRequest {
        self.chat_requests.lock().unwrap()[index].clone()
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }
}

impl ChatGateway for MockGateway {
    fn chat<'a>(&'a self, request: ChatRequest) -> ChatFuture<'a> {
        self.chat_requests.lock().unwrap().push(request);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err("mock gateway script exhausted".to_string()));
        Box::pin(async move { next.map_err(LlmError::ProviderFailure) })
    }

    fn list_models<'a>(&'a self) -> ListModelsFuture<'a> {
        let catalog = self.catalog.clone();
        Box::pin(async move {
            catalog
                .map(|ids| {
                    ids.into_iter()
                        .map(|id| ModelDescriptor { id })
                        .collect()
                })
                .map_err(LlmError::ProviderFailure)
        })
    }
}

pub fn persisted_turns(config: &Config) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(&config.chat_log_path).unwrap();
    serde_json::from_str(&raw).unwrap()
}
