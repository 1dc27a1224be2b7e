use std::sync::OnceLock;
use std::time::Duration;

use chrono::{Datelike, Local};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::normalize::{CorrectedQuery, normalize};

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.bing.com/search";

const SEARCH_TIMEOUT_SECS: u64 = 15;
const RESULT_COUNT: &str = "20";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/91.0.4472.124 Safari/537.36";

const LEAD_IN_PHRASES: &[&str] = &["what is", "tell me about", "search for"];

const FETCH_APOLOGY: &str =
    "I apologize, but I couldn't retrieve the information. Please try asking in a different way.";

// Result-block markers, tried in order. Search markup is heterogeneous and
// no single selector covers organic results, answer boxes, featured boxes,
// and news cards at once.
const BLOCK_SELECTORS: &[&str] = &["li.b_algo", "div.b_ans", "div.b_special", "div.news-card"];
const TITLE_SELECTORS: &[&str] = &["h2, h3, h4", ".title, .headline"];
const SNIPPET_SELECTORS: &[&str] = &[
    "div.b_caption, p.b_caption, div.b_snippet, p.b_snippet, div.description, p.description",
    "div.b_caption",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceItem {
    pub title: String,
    pub snippet: String,
}

// Topic-specific augmentation and snippet filtering. Fact-lookup topics that
// need disambiguating search terms or evidence vetting get an entry here.
pub struct TopicFilter {
    pub name: &'static str,
    applies: fn(&str) -> bool,
    augment: fn(&str, i32) -> String,
    keep_snippet: fn(&str) -> bool,
}

const TOPIC_FILTERS: &[TopicFilter] = &[TopicFilter {
    name: "net worth",
    applies: |query| query.to_lowercase().contains("net worth"),
    augment: |terms, year| format!("{terms} forbes bloomberg {year} current billionaire richest"),
    keep_snippet: |snippet| currency_magnitude_regex().is_match(snippet),
}];

pub fn topic_filter_for(query: &str) -> Option<&'static TopicFilter> {
    TOPIC_FILTERS.iter().find(|filter| (filter.applies)(query))
}

fn currency_magnitude_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\$?\s*[\d,.]+\s*(?:billion|million|trillion|\$)")
            .expect("currency magnitude pattern")
    })
}

#[derive(Debug, Error)]
pub enum SearchClientError {
    #[error("failed to build search http client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("bad search url: {0}")]
    Url(String),
}

#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|err| SearchClientError::HttpClient(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    // Never fails fatally: any lower-level fault becomes an apologetic
    // message string so callers have exactly one shape to handle.
    pub async fn search(&self, query: &str) -> String {
        let corrected = normalize(query);
        let terms = strip_lead_ins(&corrected.corrected);
        let filter = topic_filter_for(&corrected.corrected);
        let augmented = augment_query(&terms, filter, Local::now().year());
        debug!(query = %augmented, "issuing search request");

        let html = match self.fetch_document(&augmented).await {
            Ok(html) => html,
            Err(err) => {
                warn!("search fetch failed: {err}");
                return FETCH_APOLOGY.to_string();
            }
        };

        let items = extract_evidence(&html, filter);
        if items.is_empty() {
            return fallback_message(&terms, &corrected);
        }

        items
            .iter()
            .map(|item| format!("{}\n{}", item.title, item.snippet))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn fetch_document(&self, query: &str) -> Result<String, FetchError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[("q", query), ("format", "rss"), ("count", RESULT_COUNT)],
        )
        .map_err(|err| FetchError::Url(err.to_string()))?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Network(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))
    }
}

pub fn strip_lead_ins(query: &str) -> String {
    let mut terms = query.to_string();
    for phrase in LEAD_IN_PHRASES {
        if let Some(position) = find_ascii_case_insensitive(&terms, phrase) {
            terms.replace_range(position..position + phrase.len(), "");
        }
    }
    crate::normalize::collapse_whitespace(&terms)
}

// Byte-wise scan with an all-ASCII needle; a match is therefore always on
// char boundaries.
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

pub fn augment_query(terms: &str, filter: Option<&TopicFilter>, year: i32) -> String {
    match filter {
        Some(filter) => (filter.augment)(terms, year),
        None => format!("{terms} {year} current"),
    }
}

// One bad block never aborts the scan; extraction failures skip the block.
pub fn extract_evidence(html: &str, filter: Option<&TopicFilter>) -> Vec<EvidenceItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for selector_text in BLOCK_SELECTORS {
        let Ok(selector) = Selector::parse(selector_text) else {
            continue;
        };
        for block in document.select(&selector) {
            let Some(item) = extract_block(block) else {
                continue;
            };
            let keep = match filter {
                Some(filter) => (filter.keep_snippet)(&item.snippet),
                None => true,
            };
            if keep {
                items.push(item);
            }
        }
    }

    items
}

fn extract_block(block: ElementRef<'_>) -> Option<EvidenceItem> {
    let title = select_first_text(block, TITLE_SELECTORS)?;
    let snippet = select_first_text(block, SNIPPET_SELECTORS)?;
    if title.is_empty() || snippet.is_empty() {
        return None;
    }

    Some(EvidenceItem { title, snippet })
}

fn select_first_text(block: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for selector_text in selectors {
        let Ok(selector) = Selector::parse(selector_text) else {
            continue;
        };
        if let Some(element) = block.select(&selector).next() {
            let text = element.text().collect::<String>();
            return Some(crate::normalize::collapse_whitespace(&text));
        }
    }
    None
}

fn fallback_message(terms: &str, corrected: &CorrectedQuery) -> String {
    if corrected.changed {
        format!(
            "I found some results for '{terms}', but they don't contain specific information. \
             {} Could you try rephrasing your question or be more specific?",
            corrected.hint
        )
    } else {
        format!(
            "I found some results, but they don't seem to contain specific information \
             about {terms}. Could you try rephrasing your question?"
        )
    }
}
