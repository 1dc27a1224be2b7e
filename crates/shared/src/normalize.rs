use std::sync::OnceLock;

use regex::Regex;

const SIMILARITY_CUTOFF: f64 = 0.85;

// Conservative, deterministic fixes for domain typos the fuzzy pass cannot
// reach on its own (multi-word replacements).
const LITERAL_FIXES: &[(&str, &str)] = &[
    (r"(?i)\bnetwoth\b", "net worth"),
    (r"(?i)\bnetworth\b", "net worth"),
    (r"(?i)\bnet-worth\b", "net worth"),
];

const VOCABULARY: &[&str] = &["net", "worth", "networth", "net worth", "wealth", "elon", "musk"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedQuery {
    pub corrected: String,
    pub changed: bool,
    pub hint: String,
}

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Best-effort cleanup and typo correction; total over any input, including
// empty strings. Running the output through a second pass is a no-op.
pub fn normalize(raw: &str) -> CorrectedQuery {
    let cleaned = collapse_whitespace(raw);

    let mut corrected = cleaned.clone();
    for (index, (_, replacement)) in LITERAL_FIXES.iter().enumerate() {
        corrected = literal_fix_regex(index)
            .replace_all(&corrected, *replacement)
            .into_owned();
    }

    corrected = corrected
        .split_whitespace()
        .map(|token| match closest_vocabulary_match(token) {
            Some(replacement) => replacement.to_string(),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");

    let changed = corrected.to_lowercase() != cleaned.to_lowercase();
    let hint = if changed {
        format!("(Did you mean: '{corrected}'?)")
    } else {
        String::new()
    };

    CorrectedQuery {
        corrected,
        changed,
        hint,
    }
}

fn literal_fix_regex(index: usize) -> &'static Regex {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    let regexes = REGEXES.get_or_init(|| {
        LITERAL_FIXES
            .iter()
            .map(|(pattern, _)| Regex::new(pattern).expect("literal fix pattern"))
            .collect()
    });
    &regexes[index]
}

// Replacement happens only for a close match that actually differs from the
// token (case-insensitively), so casing alone never counts as a correction.
fn closest_vocabulary_match(token: &str) -> Option<&'static str> {
    let lowered = token.to_lowercase();
    let (best, score) = VOCABULARY
        .iter()
        .map(|candidate| (*candidate, similarity(&lowered, candidate)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

    if score >= SIMILARITY_CUTOFF && best != lowered {
        Some(best)
    } else {
        None
    }
}

// Sequence similarity in [0, 1]: twice the longest common subsequence over
// the combined length, the ratio difflib-style matchers converge on for
// short tokens.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(row[j])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }

    let lcs = prev[b.len()];
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}
