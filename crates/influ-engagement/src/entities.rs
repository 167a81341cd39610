//! Hashtag and mention extraction.
//!
//! Both entity kinds share one body grammar: an ASCII letter, digit or `_`,
//! then up to 28 letters, digits, underscores or single dots, ending in a
//! non-dot character, for at most 30 characters. Longer runs are cut to the
//! longest prefix that still fits the grammar.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const HASHTAG_SIGIL: char = '#';
pub const MENTION_SIGIL: char = '@';

const MAX_ENTITY_LEN: usize = 30;

// Captures the whole word/dot run after a sigil; `trim_entity` applies the
// no-double-dot and length rules the regex engine cannot express without
// lookahead.
static ENTITY_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([#@])([A-Za-z0-9_][A-Za-z0-9_.]*)").expect("valid regex"));

/// Distinct hashtags and mentions of one text, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

/// Returns every `sigil`-introduced entity in `text`, repeats included, in
/// order of appearance.
#[must_use]
pub fn extract_all(sigil: char, text: &str) -> Vec<String> {
    ENTITY_RUN
        .captures_iter(text)
        .filter(|caps| caps[1].starts_with(sigil))
        .map(|caps| trim_entity(&caps[2]).to_owned())
        .collect()
}

/// Returns the distinct hashtags and mentions of `text`.
///
/// Entities differing only by case are the same entity; the first spelling
/// wins.
#[must_use]
pub fn extract(text: &str) -> Entities {
    Entities {
        hashtags: dedup_case_insensitive(extract_all(HASHTAG_SIGIL, text)),
        mentions: dedup_case_insensitive(extract_all(MENTION_SIGIL, text)),
    }
}

fn dedup_case_insensitive(entities: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert(e.to_lowercase()))
        .collect()
}

/// Cuts a raw run to the longest prefix matching the body grammar.
///
/// The run is non-empty and starts with a non-dot character, so the result is
/// never empty.
fn trim_entity(run: &str) -> &str {
    let run = run.find("..").map_or(run, |i| &run[..i]);
    // The run is ASCII, so byte and char lengths agree.
    let run = &run[..run.len().min(MAX_ENTITY_LEN)];
    run.trim_end_matches('.')
}
