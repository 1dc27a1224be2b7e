use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{ChatGateway, ModelDescriptor};

pub const DEFAULT_MODEL_ID: &str = "groq/compound";

// Fastest first; the first one the catalog actually lists wins.
const PREFERRED_MODELS: &[&str] = &["llama-3.1-8b-instant", "groq/compound-mini", "groq/compound"];

const CHAT_MODEL_KEYWORDS: &[&str] = &["llama", "gpt", "compound"];
const NON_CHAT_MARKERS: &[&str] = &["whisper", "tts", "embed"];

#[derive(Debug, Error)]
#[error("no alternative chat model is available")]
pub struct NoModelAvailable;

#[derive(Debug, Clone)]
pub struct ModelResolver {
    selected: String,
}

impl ModelResolver {
    // Catalog probe at startup. Never fails: an unreachable catalog or one
    // with no usable entry falls back to the hardcoded default id.
    pub async fn select(gateway: &dyn ChatGateway) -> Self {
        let selected = match gateway.list_models().await {
            Ok(catalog) => match pick_from_catalog(&catalog) {
                Some(id) => id,
                None => {
                    warn!("model catalog lists no usable chat model, using default");
                    DEFAULT_MODEL_ID.to_string()
                }
            },
            Err(err) => {
                warn!("model catalog probe failed, using default: {err}");
                DEFAULT_MODEL_ID.to_string()
            }
        };

        info!(model = %selected, "chat model selected");
        Self { selected }
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    // Reactive failover after a request failure: any listed model other than
    // the one that just failed. An empty or unreachable catalog is fatal for
    // the current request.
    pub async fn failover(
        &mut self,
        gateway: &dyn ChatGateway,
    ) -> Result<String, NoModelAvailable> {
        let catalog = gateway.list_models().await.map_err(|err| {
            warn!("model catalog unavailable during failover: {err}");
            NoModelAvailable
        })?;

        let replacement = catalog
            .into_iter()
            .map(|model| model.id)
            .find(|id| id != &self.selected)
            .ok_or(NoModelAvailable)?;

        info!(from = %self.selected, to = %replacement, "failing over to alternative model");
        self.selected = replacement.clone();
        Ok(replacement)
    }
}

fn pick_from_catalog(catalog: &[ModelDescriptor]) -> Option<String> {
    for preferred in PREFERRED_MODELS {
        if catalog.iter().any(|model| model.id == *preferred) {
            return Some((*preferred).to_string());
        }
    }

    debug!("no preferred model listed, scanning catalog for a chat model");
    catalog
        .iter()
        .find(|model| {
            let id = model.id.to_lowercase();
            CHAT_MODEL_KEYWORDS.iter().any(|keyword| id.contains(keyword))
                && !NON_CHAT_MARKERS.iter().any(|marker| id.contains(marker))
        })
        .map(|model| model.id.clone())
}
