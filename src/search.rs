//! Keyword retrieval over the knowledge store.
//!
//! # Scoring
//!
//! ```text
//! score = |entry.keywords ∩ query_keywords| / |query_keywords|
//! ```
//!
//! The score measures how much of the *query* an entry covers. It is not
//! normalized by the entry's own keyword count, so large entries that touch
//! many query terms are not penalized.
//!
//! Entries scoring at or below the threshold are dropped. The rest are sorted
//! by descending score with a stable sort, so ties keep store insertion order.

use serde::Serialize;
use std::collections::HashSet;

use crate::keywords::tokenize_query;
use crate::models::KnowledgeEntry;
use crate::store::KnowledgeStore;

/// Default relevance threshold (exclusive).
pub const DEFAULT_MIN_SCORE: f64 = 0.1;

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit<'a> {
    pub entry: &'a KnowledgeEntry,
    pub score: f64,
}

/// Fraction of `query_keywords` present in the entry. Always in `[0, 1]`.
pub fn score(entry: &KnowledgeEntry, query_keywords: &[String]) -> f64 {
    if query_keywords.is_empty() {
        return 0.0;
    }
    let matched = query_keywords
        .iter()
        .filter(|k| entry.keywords.contains(k.as_str()))
        .count();
    matched as f64 / query_keywords.len() as f64
}

/// Rank every entry in `store` against `query`.
///
/// Returns nothing for a query with no usable keywords. Never mutates the store.
pub fn search<'a>(store: &'a KnowledgeStore, query: &str, min_score: f64) -> Vec<SearchHit<'a>> {
    let query_keywords = tokenize_query(query);
    if query_keywords.is_empty() {
        return Vec::new();
    }
    // tokenize_query already deduplicates; keep the invariant explicit
    debug_assert_eq!(
        query_keywords.iter().collect::<HashSet<_>>().len(),
        query_keywords.len()
    );

    let mut hits: Vec<SearchHit<'a>> = store
        .entries()
        .iter()
        .filter_map(|entry| {
            let s = score(entry, &query_keywords);
            (s > min_score).then_some(SearchHit { entry, score: s })
        })
        .collect();

    // sort_by is stable
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryBuilder;
    use crate::models::EntryType;

    fn entry_with(keywords: &[&str]) -> KnowledgeEntry {
        let mut e = EntryBuilder::new(EntryType::TextContent, "a.ts", "").build();
        e.keywords = keywords.iter().map(|k| k.to_string()).collect();
        e
    }

    #[test]
    fn subscription_payment_scenario() {
        let mut store = KnowledgeStore::new();
        store.push(entry_with(&["subscription", "payment", "stripe"]));

        let hits = search(&store, "How does subscription payment work?", DEFAULT_MIN_SCORE);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn stop_word_queries_return_nothing() {
        let mut store = KnowledgeStore::new();
        store.push(entry_with(&["the", "how", "does"]));
        assert!(search(&store, "how does the", DEFAULT_MIN_SCORE).is_empty());
        assert!(search(&store, "a b c", DEFAULT_MIN_SCORE).is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        // 1 of 10 query keywords = exactly 0.1, which is not > 0.1
        let mut store = KnowledgeStore::new();
        store.push(entry_with(&["alpha"]));
        let q = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        assert!(search(&store, q, DEFAULT_MIN_SCORE).is_empty());
        assert_eq!(search(&store, q, 0.05).len(), 1);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut store = KnowledgeStore::new();
        let first = entry_with(&["billing"]);
        let second = entry_with(&["billing", "invoice"]);
        let third = entry_with(&["billing"]);
        let (first_id, second_id, third_id) =
            (first.id.clone(), second.id.clone(), third.id.clone());
        store.extend([first, second, third]);

        let hits = search(&store, "billing invoice", DEFAULT_MIN_SCORE);
        let ids: Vec<&str> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, vec![second_id.as_str(), first_id.as_str(), third_id.as_str()]);
    }

    #[test]
    fn search_is_deterministic() {
        let mut store = KnowledgeStore::new();
        for kws in [&["member", "state"][..], &["member"], &["state", "machine"]] {
            store.push(entry_with(kws));
        }
        let a: Vec<String> = search(&store, "member state machine", DEFAULT_MIN_SCORE)
            .iter()
            .map(|h| h.entry.id.clone())
            .collect();
        let b: Vec<String> = search(&store, "member state machine", DEFAULT_MIN_SCORE)
            .iter()
            .map(|h| h.entry.id.clone())
            .collect();
        assert_eq!(a, b);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn score_is_bounded_and_monotone() {
        let q: Vec<String> = ["alpha", "bravo", "charlie", "delta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let one = score(&entry_with(&["alpha"]), &q);
        let two = score(&entry_with(&["alpha", "bravo"]), &q);
        let all = score(&entry_with(&["alpha", "bravo", "charlie", "delta", "zulu"]), &q);
        assert!(one <= two);
        assert_eq!(all, 1.0);
        assert_eq!(score(&entry_with(&["alpha"]), &[]), 0.0);
    }
}
