use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier;
use crate::composer;
use crate::config::Config;
use crate::llm::{ChatGateway, ChatRequest};
use crate::models::{ActionCategory, ActionToken, Classification, Turn};
use crate::resolver::ModelResolver;
use crate::search::{SearchClient, SearchClientError};
use crate::turn_log::{PERSISTED_TURN_CAP, TurnLog, TurnLogStore};

const CONNECTIVITY_APOLOGY: &str = "I apologize, but I cannot connect to the AI service right \
                                    now. Please check your internet connection.";
const FATAL_APOLOGY: &str = "I apologize, but I encountered an error and had to reset our \
                             conversation. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayAvailability {
    Ready,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub answer: Option<String>,
    pub actions: Vec<ActionToken>,
}

// One user's conversation: owns the turn log, the selected model, and the
// capability state. Nothing here is shared across sessions.
pub struct Session {
    persona: String,
    gateway: Arc<dyn ChatGateway>,
    search: SearchClient,
    resolver: ModelResolver,
    availability: GatewayAvailability,
    log: TurnLog,
    store: TurnLogStore,
}

impl Session {
    pub async fn start(
        config: &Config,
        gateway: Arc<dyn ChatGateway>,
    ) -> Result<Self, SearchClientError> {
        let search = SearchClient::new(config.search_endpoint.clone())?;

        // Capability availability is decided once, up front; per-request
        // handling branches on this state instead of re-probing.
        let availability = match gateway.list_models().await {
            Ok(_) => GatewayAvailability::Ready,
            Err(err) => {
                warn!("chat provider unreachable, starting in degraded mode: {err}");
                GatewayAvailability::Degraded
            }
        };

        let resolver = ModelResolver::select(gateway.as_ref()).await;

        let store = TurnLogStore::new(&config.chat_log_path);
        let turns = match store.load() {
            Ok(turns) => turns,
            Err(err) => {
                warn!("failed to load chat log, starting empty: {err}");
                Vec::new()
            }
        };
        let log = TurnLog::from_turns(turns, PERSISTED_TURN_CAP);
        info!(turns = log.len(), "session started");

        Ok(Self {
            persona: composer::persona(&config.assistant_name, &config.user_name),
            gateway,
            search,
            resolver,
            availability,
            log,
            store,
        })
    }

    pub fn availability(&self) -> GatewayAvailability {
        self.availability
    }

    pub fn turn_count(&self) -> usize {
        self.log.len()
    }

    pub async fn handle(&mut self, utterance: &str) -> TurnOutcome {
        if self.availability == GatewayAvailability::Degraded {
            return self.handle_degraded(utterance).await;
        }

        let classification =
            classifier::classify(self.gateway.as_ref(), self.resolver.selected(), utterance).await;
        let tokens = match classification {
            Classification::Actions(tokens) => tokens,
            Classification::Failed(message) => {
                warn!("classification unavailable: {message}");
                return TurnOutcome {
                    answer: Some(CONNECTIVITY_APOLOGY.to_string()),
                    actions: Vec::new(),
                };
            }
        };

        let (conversational, actions): (Vec<_>, Vec<_>) = tokens
            .into_iter()
            .partition(|token| token.category.is_conversational());
        let needs_search = conversational
            .iter()
            .any(|token| token.category == ActionCategory::Realtime);

        let answer = if conversational.is_empty() {
            None
        } else if needs_search {
            Some(self.respond_grounded(utterance).await)
        } else {
            Some(self.respond_plain(utterance).await)
        };

        TurnOutcome { answer, actions }
    }

    // Degraded mode: no completion capability, so the raw evidence text is
    // the answer. It is still recorded as an assistant turn.
    async fn handle_degraded(&mut self, utterance: &str) -> TurnOutcome {
        let evidence = self.search.search(utterance).await;
        self.log.push(Turn::user(utterance));
        let answer = composer::tidy_answer(&evidence);
        self.log.push(Turn::assistant(answer.clone()));
        self.persist();

        TurnOutcome {
            answer: Some(answer),
            actions: Vec::new(),
        }
    }

    async fn respond_grounded(&mut self, prompt: &str) -> String {
        let evidence = self.search.search(prompt).await;
        self.log.push(Turn::user(prompt));
        let messages =
            composer::assemble_grounded_messages(&self.persona, prompt, &evidence, &self.log);
        let request = ChatRequest::new(self.resolver.selected(), messages)
            .with_decode(composer::SEARCH_TEMPERATURE, composer::SEARCH_TOP_P);
        self.complete(request).await
    }

    async fn respond_plain(&mut self, prompt: &str) -> String {
        self.log.push(Turn::user(prompt));
        let messages = composer::assemble_chat_messages(&self.persona, &self.log);
        let request = ChatRequest::new(self.resolver.selected(), messages);
        self.complete(request).await
    }

    // One failover and one retry; a second failure resets the history so a
    // partial turn is never left behind.
    async fn complete(&mut self, request: ChatRequest) -> String {
        let first = self.gateway.chat(request.clone()).await;
        let err = match first {
            Ok(answer) => return self.record_answer(&answer),
            Err(err) => err,
        };
        warn!(model = %request.model, "chat completion failed: {err}");

        let failover = self.resolver.failover(self.gateway.as_ref()).await;
        let replacement = match failover {
            Ok(replacement) => replacement,
            Err(err) => {
                warn!("{err}");
                return self.reset();
            }
        };

        let mut retry = request;
        retry.model = replacement;
        let second = self.gateway.chat(retry).await;
        match second {
            Ok(answer) => self.record_answer(&answer),
            Err(err) => {
                warn!("retry with alternative model failed: {err}");
                self.reset()
            }
        }
    }

    fn record_answer(&mut self, answer: &str) -> String {
        let answer = composer::tidy_answer(answer);
        self.log.push(Turn::assistant(answer.clone()));
        self.persist();
        answer
    }

    fn reset(&mut self) -> String {
        self.log.clear();
        self.persist();
        FATAL_APOLOGY.to_string()
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.log.turns()) {
            warn!("failed to persist chat log: {err}");
        }
    }
}
