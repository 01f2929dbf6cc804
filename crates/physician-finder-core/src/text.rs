//! Text matching primitives shared by the store backends.
//!
//! The Postgres store delegates matching to `pg_trgm` and full-text search;
//! the functions here build its query inputs (prefix tsquery, escaped LIKE
//! patterns) and give the in-memory store the same semantics:
//!
//! - [`trigram_similarity`] follows `pg_trgm`'s `similarity()`: lowercase,
//!   split into alphanumeric words, pad each word with two leading spaces and
//!   one trailing space, take the set of 3-character windows, and return
//!   `|A ∩ B| / |A ∪ B|`.
//! - [`name_lexemes`] mirrors `to_tsvector('simple', ...)` on a full name.
//! - [`ts_prefix_match`] / [`ts_rank`] evaluate a prefix query against
//!   lexemes.

use std::collections::HashSet;

/// Lowercased alphanumeric words of `s`.
pub fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// The `pg_trgm` trigram set of `s`.
pub fn trigrams(s: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    for word in words(s) {
        let padded: Vec<char> = format!("  {} ", word).chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Trigram similarity in `[0.0, 1.0]`, matching `pg_trgm`'s `similarity(a, b)`.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let common = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - common;
    common as f64 / union as f64
}

/// Prefix terms of a free-text query: every alphanumeric word, lowercased.
///
/// Punctuation splits words the same way the `simple` text-search parser
/// does, so `o'brien` yields `o` and `brien`.
pub fn prefix_terms(query: &str) -> Vec<String> {
    words(query)
}

/// Builds a `to_tsquery('simple', ...)` input where every term is a prefix
/// match and all terms must match: `"car ill"` → `"car:* & ill:*"`.
///
/// Returns `None` when the query has no usable terms.
pub fn prefix_tsquery(query: &str) -> Option<String> {
    let terms = prefix_terms(query);
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("{}:*", t))
            .collect::<Vec<_>>()
            .join(" & "),
    )
}

/// Escapes `LIKE`/`ILIKE` metacharacters using the default `\` escape.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Lexemes of the full-name search vector: first, middle and last name.
pub fn name_lexemes(first: &str, middle: Option<&str>, last: &str) -> Vec<String> {
    let mut lexemes = words(first);
    if let Some(m) = middle {
        lexemes.extend(words(m));
    }
    lexemes.extend(words(last));
    lexemes
}

/// True when every term is a prefix of at least one lexeme.
pub fn ts_prefix_match(lexemes: &[String], terms: &[String]) -> bool {
    !terms.is_empty()
        && terms
            .iter()
            .all(|t| lexemes.iter().any(|l| l.starts_with(t.as_str())))
}

/// Relevance of a prefix query against a name vector: the share of lexemes
/// hit by some term, or `0.0` when the query does not match.
pub fn ts_rank(lexemes: &[String], terms: &[String]) -> f64 {
    if lexemes.is_empty() || !ts_prefix_match(lexemes, terms) {
        return 0.0;
    }
    let hit = lexemes
        .iter()
        .filter(|l| terms.iter().any(|t| l.starts_with(t.as_str())))
        .count();
    hit as f64 / lexemes.len() as f64
}

/// Case-insensitive substring test, the in-memory counterpart of `ILIKE '%x%'`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
