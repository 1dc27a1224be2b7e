use chrono::Local;

use crate::models::Turn;
use crate::turn_log::{CHAT_CONTEXT_WINDOW, SEARCH_CONTEXT_WINDOW, TurnLog};

// The grounded path narrows sampling below the chat defaults so the model
// stays on the evidence.
pub const SEARCH_TEMPERATURE: f32 = 0.3;
pub const SEARCH_TOP_P: f32 = 0.8;

const END_OF_TURN_ARTIFACT: &str = "</s>";

pub fn persona(assistant_name: &str, user_name: &str) -> String {
    format!(
        "You are {assistant_name}, a concise AI assistant for {user_name}. \
         Give direct, focused answers in English. No meta-commentary."
    )
}

pub fn realtime_information() -> String {
    format!("Current time: {}", Local::now().format("%A, %B %d, %Y %H:%M"))
}

pub fn grounding_instruction(prompt: &str) -> String {
    format!(
        "Use the following search results to answer the question: '{prompt}'. \
         Only use information from these results. If the search results don't \
         contain relevant information, say that you need to search for more \
         specific details."
    )
}

// Plain conversational path: persona, live time, then the capped recent
// window (which already contains the just-appended user turn).
pub fn assemble_chat_messages(persona: &str, log: &TurnLog) -> Vec<Turn> {
    let mut messages = vec![Turn::system(persona), Turn::system(realtime_information())];
    messages.extend(log.recent(CHAT_CONTEXT_WINDOW));
    messages
}

// Search-grounded path: persona, grounding instruction, the evidence block,
// live time, then a tighter recent window to keep the context focused.
pub fn assemble_grounded_messages(
    persona: &str,
    prompt: &str,
    evidence: &str,
    log: &TurnLog,
) -> Vec<Turn> {
    let mut messages = vec![
        Turn::system(persona),
        Turn::system(grounding_instruction(prompt)),
        Turn::system(evidence),
        Turn::system(realtime_information()),
    ];
    messages.extend(log.recent(SEARCH_CONTEXT_WINDOW));
    messages
}

// Presentation cleanup only: drop the provider's end-of-turn artifact and
// blank lines.
pub fn tidy_answer(answer: &str) -> String {
    answer
        .replace(END_OF_TURN_ARTIFACT, "")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
