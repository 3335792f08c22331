//! Tokenization shared by indexing and querying.
//!
//! Queries and entries are reduced to lowercase keyword sets. Tokens of two
//! characters or fewer and common English stop-words never become keywords,
//! so a question made only of such words matches nothing.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

/// Tokens shorter than or equal to this are discarded.
const MIN_TOKEN_CHARS: usize = 2;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
        "one", "our", "out", "has", "him", "his", "how", "its", "may", "now", "see", "who", "did",
        "does", "doing", "done", "what", "when", "where", "which", "why", "with", "this", "that",
        "from", "they", "have", "been", "being", "will", "would", "could", "should", "there",
        "their", "about", "into", "than", "then", "them", "these", "those", "some", "such",
        "only", "also", "just", "like", "your", "more", "most", "other", "over", "very", "here",
        "each", "were", "tell", "explain", "please", "show", "describe", "whats",
        "something", "anything",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

fn keep(token: &str) -> bool {
    token.chars().count() > MIN_TOKEN_CHARS && !is_stop_word(token)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize a query: lowercase, strip non-word characters, split, drop short
/// tokens and stop-words, deduplicate keeping first occurrence order.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let cleaned: String = query
        .to_lowercase()
        .chars()
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|t| keep(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Derive the keyword set of a piece of entry content.
///
/// Compound identifiers contribute both the whole token and its parts:
/// `handleSubscriptionPayment` yields `handlesubscriptionpayment`,
/// `handle`, `subscription` and `payment`.
pub fn keywords_from_text(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for raw in text.split(|c: char| !is_word_char(c)) {
        if raw.is_empty() {
            continue;
        }
        let whole = raw.to_lowercase();
        if keep(&whole) {
            out.insert(whole);
        }
        for part in split_identifier(raw) {
            let part = part.to_lowercase();
            if keep(&part) {
                out.insert(part);
            }
        }
    }
    out
}

/// Keywords for a repository path: every segment, extension stripped.
pub fn keywords_from_path(path: &str) -> BTreeSet<String> {
    let without_ext = match path.rfind('.') {
        Some(dot) if dot > path.rfind('/').map(|s| s + 1).unwrap_or(0) => &path[..dot],
        _ => path,
    };
    keywords_from_text(&without_ext.replace(['/', '-', '.'], " "))
}

/// Split `camelCase`, `PascalCase` and `snake_case` identifiers into parts.
fn split_identifier(ident: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for piece in ident.split('_').filter(|p| !p.is_empty()) {
        let chars: Vec<char> = piece.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            let boundary = i > 0
                && c.is_uppercase()
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false));
            if boundary && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            current.push(c);
        }
        if !current.is_empty() {
            parts.push(current);
        }
    }
    if parts.len() <= 1 {
        return Vec::new();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize_query("How does subscription payment work?"),
            vec!["subscription", "payment", "work"]
        );
    }

    #[test]
    fn trivial_query_is_empty() {
        assert!(tokenize_query("how is it a to do?").is_empty());
        assert!(tokenize_query("   ").is_empty());
        assert!(tokenize_query("?!").is_empty());
    }

    #[test]
    fn query_tokens_are_deduplicated_in_order() {
        assert_eq!(
            tokenize_query("Stripe webhook, stripe WEBHOOK retries"),
            vec!["stripe", "webhook", "retries"]
        );
    }

    #[test]
    fn compound_identifiers_split() {
        let kws = keywords_from_text("function handleSubscriptionPayment(user_id)");
        for expected in [
            "function",
            "handlesubscriptionpayment",
            "handle",
            "subscription",
            "payment",
            "user_id",
            "user",
        ] {
            assert!(kws.contains(expected), "missing {}", expected);
        }
        // "id" is too short on its own
        assert!(!kws.contains("id"));
    }

    #[test]
    fn acronym_boundaries() {
        assert_eq!(split_identifier("parseHTTPResponse"), vec!["parse", "HTTP", "Response"]);
        assert!(split_identifier("plain").is_empty());
    }

    #[test]
    fn path_keywords() {
        let kws = keywords_from_path("src/services/member-state.service.ts");
        assert!(kws.contains("services"));
        assert!(kws.contains("member"));
        assert!(kws.contains("state"));
        assert!(kws.contains("service"));
        assert!(!kws.contains("ts"));
    }
}
