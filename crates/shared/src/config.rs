use std::env;
use std::path::PathBuf;

use crate::search::DEFAULT_SEARCH_ENDPOINT;

const DEFAULT_USER_NAME: &str = "User";
const DEFAULT_ASSISTANT_NAME: &str = "Assistant";
const DEFAULT_CHAT_LOG_PATH: &str = "data/chat_log.json";

// Session-level settings. Everything here has a sensible default; the one
// required credential (the provider API key) is validated by
// `GroqGatewayConfig::from_env` and is fatal at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub user_name: String,
    pub assistant_name: String,
    pub chat_log_path: PathBuf,
    pub search_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            user_name: non_empty_env("ASSISTANT_USER_NAME", DEFAULT_USER_NAME),
            assistant_name: non_empty_env("ASSISTANT_NAME", DEFAULT_ASSISTANT_NAME),
            chat_log_path: PathBuf::from(non_empty_env("CHAT_LOG_PATH", DEFAULT_CHAT_LOG_PATH)),
            search_endpoint: non_empty_env("SEARCH_ENDPOINT", DEFAULT_SEARCH_ENDPOINT),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            chat_log_path: PathBuf::from(DEFAULT_CHAT_LOG_PATH),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }
}

fn non_empty_env(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
