use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    General,
    Realtime,
    Open,
    Close,
    Play,
    GenerateImage,
    System,
    Content,
    GoogleSearch,
    YoutubeSearch,
    Reminder,
}

impl ActionCategory {
    pub const ALL: [ActionCategory; 11] = [
        ActionCategory::General,
        ActionCategory::Realtime,
        ActionCategory::Open,
        ActionCategory::Close,
        ActionCategory::Play,
        ActionCategory::GenerateImage,
        ActionCategory::System,
        ActionCategory::Content,
        ActionCategory::GoogleSearch,
        ActionCategory::YoutubeSearch,
        ActionCategory::Reminder,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            ActionCategory::General => "general",
            ActionCategory::Realtime => "realtime",
            ActionCategory::Open => "open",
            ActionCategory::Close => "close",
            ActionCategory::Play => "play",
            ActionCategory::GenerateImage => "generate image",
            ActionCategory::System => "system",
            ActionCategory::Content => "content",
            ActionCategory::GoogleSearch => "google search",
            ActionCategory::YoutubeSearch => "youtube search",
            ActionCategory::Reminder => "reminder",
        }
    }

    pub fn is_conversational(self) -> bool {
        matches!(self, ActionCategory::General | ActionCategory::Realtime)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionToken {
    pub category: ActionCategory,
    pub argument: String,
}

impl ActionToken {
    pub fn general(argument: impl Into<String>) -> Self {
        Self {
            category: ActionCategory::General,
            argument: argument.into(),
        }
    }

    // Parses one `category (argument)` piece of a classifier reply. The
    // keyword must be followed by end-of-input, whitespace, or an opening
    // paren; anything else is not a token from the vocabulary.
    pub fn parse(piece: &str) -> Option<Self> {
        let piece = piece.trim();

        let category = ActionCategory::ALL
            .into_iter()
            .filter(|category| {
                let keyword = category.keyword();
                let Some(prefix) = piece.get(..keyword.len()) else {
                    return false;
                };
                prefix.eq_ignore_ascii_case(keyword)
                    && piece[keyword.len()..]
                        .chars()
                        .next()
                        .is_none_or(|c| c.is_whitespace() || c == '(')
            })
            .max_by_key(|category| category.keyword().len())?;

        let rest = piece[category.keyword().len()..].trim();
        let argument = rest
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .unwrap_or(rest)
            .trim()
            .to_string();

        Some(Self { category, argument })
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.argument.is_empty() {
            write!(f, "{}", self.category.keyword())
        } else {
            write!(f, "{} {}", self.category.keyword(), self.argument)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Actions(Vec<ActionToken>),
    Failed(String),
}
