use tracing::warn;

use crate::llm::{ChatGateway, ChatRequest};
use crate::models::{ActionToken, Classification, Turn};

const MAX_AMBIGUITY_RETRIES: u32 = 1;

// The model sometimes echoes the grammar's placeholder back instead of
// substituting the actual query; that reply is ambiguous and retried once.
const PLACEHOLDER_MARKER: &str = "(query)";

const PREAMBLE: &str = "\
You are a very accurate Decision-Making Model, which decides what kind of a query is given to you.
You will decide whether a query is a 'general' query, a 'realtime' query, or is asking to perform \
any task or automation like 'open facebook, instagram', 'can you write a application and open it in notepad'
*** Do not answer any query, just decide what kind of query is given to you. ***
-> Respond with 'general ( query )' if a query can be answered by a llm model (conversational ai chatbot) \
and doesn't require any up to date information.
-> Respond with 'realtime ( query )' if a query can not be answered by a llm model and requires up to \
date information.
-> Respond with 'open (application name or website name)' if a query is asking to open any application.
-> Respond with 'close (application name)' if a query is asking to close any application.
-> Respond with 'play (song name)' if a query is asking to play any song.
-> Respond with 'generate image (image prompt)' if a query is requesting to generate an image.
-> Respond with 'reminder (datetime with message)' if a query is requesting to set a reminder.
-> Respond with 'system (task name)' if a query is asking to perform system tasks.
-> Respond with 'content (topic)' if a query is asking to write any type of content.
-> Respond with 'google search (topic)' if a query is asking to search on google.
-> Respond with 'youtube search (topic)' if a query is asking to search on youtube.
*** Respond with 'general (query)' if you can't decide the kind of query. ***";

// Fixed example exchanges establishing the response grammar, including
// multi-action decomposition and mixed general+reminder splits.
const FEW_SHOT_EXCHANGES: &[(&str, &str)] = &[
    ("how are you?", "general how are you?"),
    ("do you like pizza?", "general do you like pizza?"),
    (
        "open chrome and tell me about mahatma gandhi",
        "open chrome, general tell me about mahatma gandhi",
    ),
    ("open chrome and firefox", "open chrome, open firefox"),
    (
        "what is today's date and by the way remind me that i have dancing performance on 5th aug at 11pm",
        "general what is today's date, reminder 11pm 5th aug dancing performance",
    ),
    ("chat with me", "general chat with me"),
];

#[derive(Debug, PartialEq, Eq)]
struct ParsedReply {
    tokens: Vec<ActionToken>,
    echoed_placeholder: bool,
}

pub async fn classify(gateway: &dyn ChatGateway, model: &str, utterance: &str) -> Classification {
    let mut attempt = 0_u32;

    loop {
        let reply = match gateway.chat(classification_request(model, utterance)).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("classification request failed: {err}");
                return Classification::Failed(err.to_string());
            }
        };

        let parsed = parse_reply(&reply);
        if parsed.echoed_placeholder && attempt < MAX_AMBIGUITY_RETRIES {
            warn!(attempt, "classifier echoed the grammar placeholder, retrying");
            attempt += 1;
            continue;
        }
        if parsed.echoed_placeholder {
            return Classification::Actions(vec![ActionToken::general(utterance)]);
        }

        if parsed.tokens.is_empty() {
            return Classification::Actions(vec![ActionToken::general(utterance)]);
        }
        return Classification::Actions(parsed.tokens);
    }
}

fn classification_request(model: &str, utterance: &str) -> ChatRequest {
    let mut messages = vec![Turn::system(PREAMBLE)];
    for (user, assistant) in FEW_SHOT_EXCHANGES {
        messages.push(Turn::user(*user));
        messages.push(Turn::assistant(*assistant));
    }
    messages.push(Turn::user(utterance));

    ChatRequest::new(model, messages)
}

fn parse_reply(reply: &str) -> ParsedReply {
    let flattened = reply.replace('\n', "");
    let mut tokens = Vec::new();
    let mut echoed_placeholder = false;

    for piece in flattened.split(',') {
        let piece = piece.trim();
        let Some(token) = ActionToken::parse(piece) else {
            continue;
        };
        if piece.contains(PLACEHOLDER_MARKER) {
            echoed_placeholder = true;
        }
        tokens.push(token);
    }

    ParsedReply {
        tokens,
        echoed_placeholder,
    }
}
