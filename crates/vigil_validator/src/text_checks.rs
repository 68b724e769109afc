//! Text heuristics.

use crate::ValidatorConfig;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::trace;
use vigil_core::{IssueCategory, ValidationIssue};

fn error_keywords() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(error|failed|unable|cannot|sorry|apologize)\b").expect("valid regex")
    })
}

/// An error report anywhere in the text, such as `Error: quota exceeded`.
fn embedded_error() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(error|exception|failure)\s*:").expect("valid regex")
    })
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}']+").expect("valid regex"))
}

const ANTONYMS: &[(&str, &str)] = &[
    ("always", "never"),
    ("all", "none"),
    ("everything", "nothing"),
    ("everyone", "nobody"),
    ("true", "false"),
    ("possible", "impossible"),
    ("increase", "decrease"),
];

const TRANSITIONS: &[&str] = &[
    "however",
    "therefore",
    "moreover",
    "furthermore",
    "additionally",
    "meanwhile",
    "consequently",
    "thus",
    "also",
    "then",
    "finally",
    "first",
    "second",
    "next",
    "because",
    "although",
    "while",
    "instead",
];

const TERMINAL: &[char] = &['.', '!', '?', '…', '"', '\'', ')', '”'];

pub(crate) fn words(text: &str) -> Vec<String> {
    word_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Run every text check. Too-short text short-circuits the rest.
pub(crate) fn check_text(text: &str, config: &ValidatorConfig) -> Vec<ValidationIssue> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length < *config.min_text_chars() {
        return vec![ValidationIssue::critical(
            IssueCategory::TextQuality,
            format!(
                "text too short: {length} characters, minimum is {}",
                config.min_text_chars()
            ),
        )];
    }

    let mut issues = Vec::new();

    let head: String = trimmed
        .chars()
        .take(*config.error_scan_chars())
        .collect::<String>()
        .to_lowercase();
    if let Some(found) = error_keywords().find(&head) {
        issues.push(ValidationIssue::critical(
            IssueCategory::TextError,
            format!("text appears to be an error message ('{}')", found.as_str()),
        ));
    } else if let Some(found) = embedded_error().find(trimmed) {
        issues.push(ValidationIssue::critical(
            IssueCategory::TextError,
            format!("text embeds an error report ('{}')", found.as_str()),
        ));
    }

    if !trimmed.ends_with(TERMINAL) {
        issues.push(ValidationIssue::minor(
            IssueCategory::TextQuality,
            "text is missing terminal punctuation",
        ));
    }

    let words = words(trimmed);

    if let Some((a, b)) = contradiction(&words) {
        issues.push(ValidationIssue::minor(
            IssueCategory::TextContradiction,
            format!("possible contradiction: '{a}' and '{b}'"),
        ));
    }

    if words.len() >= *config.min_repetition_words() {
        let ratio = repetition_ratio(&words);
        trace!(ratio, "Word repetition ratio");
        if ratio > *config.max_repetition_ratio() {
            issues.push(ValidationIssue::major(
                IssueCategory::TextQuality,
                format!("excessive word repetition (ratio {ratio:.2})"),
            ));
        }
    }

    let coherence = coherence_score(trimmed, &words);
    trace!(coherence, "Coherence score");
    if coherence < *config.min_coherence() {
        issues.push(ValidationIssue::minor(
            IssueCategory::TextQuality,
            format!("text may lack coherence (score {coherence:.2})"),
        ));
    }

    issues
}

fn contradiction(words: &[String]) -> Option<(&'static str, &'static str)> {
    let present: HashSet<&str> = words.iter().map(String::as_str).collect();
    ANTONYMS
        .iter()
        .copied()
        .find(|(a, b)| present.contains(a) && present.contains(b))
}

/// Most frequent word's share of all words.
pub(crate) fn repetition_ratio(words: &[String]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max as f64 / words.len() as f64
}

/// Blend of sentence-length banding (70%) and transition-word presence (30%).
///
/// Texts of one or two sentences get full transition credit.
pub(crate) fn coherence_score(text: &str, words: &[String]) -> f64 {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let average = words.len() as f64 / sentences.len() as f64;
    let length_score = if (5.0..=30.0).contains(&average) {
        1.0
    } else if (3.0..=50.0).contains(&average) {
        0.5
    } else {
        0.2
    };
    let has_transition = words.iter().any(|w| TRANSITIONS.contains(&w.as_str()));
    let transition_score = if has_transition || sentences.len() <= 2 {
        1.0
    } else {
        0.0
    };
    0.7 * length_score + 0.3 * transition_score
}
