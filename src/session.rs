//! The knowledge session: one explicit owner for all mutable pipeline state.
//!
//! A [`KnowledgeSession`] holds the knowledge store, the processed-file
//! cache, the learned successful-path patterns and the latest progress
//! snapshot. Explorer, processor and retrieval receive it by reference, so
//! independent sessions never share state and tests need no global reset.
//!
//! Every mutating operation takes `&mut self`; a refresh can therefore never
//! overlap an in-flight exploration of the same session.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::explorer::{ExploreReport, Explorer};
use crate::fallback::fallback_entries;
use crate::history::HistoryProvider;
use crate::models::RepoCoordinate;
use crate::progress::ScanProgress;
use crate::search::{search, SearchHit};
use crate::store::{KnowledgeStore, StoreStats};

#[derive(Debug, Default)]
pub struct KnowledgeSession {
    store: KnowledgeStore,
    /// Processed paths and whether their first attempt stored any entry.
    processed: HashMap<String, bool>,
    patterns: Vec<String>,
    progress: ScanProgress,
    degraded: bool,
}

impl KnowledgeSession {
    /// An empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session pre-seeded with the fallback dataset.
    pub fn with_fallback() -> Self {
        let mut session = Self::new();
        session.seed_fallback();
        session
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut KnowledgeStore {
        &mut self.store
    }

    pub fn is_processed(&self, path: &str) -> bool {
        self.processed.contains_key(path)
    }

    /// True when `path` was processed and its content is in the store.
    pub fn is_indexed(&self, path: &str) -> bool {
        self.processed.get(path).copied().unwrap_or(false)
    }

    /// Cache `path`; the first attempt decides whether it counts as indexed.
    pub(crate) fn mark_processed(&mut self, path: &str, indexed: bool) {
        self.processed.entry(path.to_string()).or_insert(indexed);
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Learned successful path prefixes, oldest first.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Append a successful path pattern unless already known.
    pub(crate) fn record_pattern(&mut self, path: &str) -> bool {
        if self.patterns.iter().any(|p| p == path) {
            return false;
        }
        debug!(path, "learned successful path");
        self.patterns.push(path.to_string());
        self.progress.successful_paths = self.patterns.len();
        true
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    pub(crate) fn progress_mut(&mut self) -> &mut ScanProgress {
        &mut self.progress
    }

    /// True when the session answers from the fallback dataset because
    /// exploration found nothing.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub(crate) fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats(self.processed.len())
    }

    /// Ranked entries for `query`. Read-only.
    pub fn search(&self, query: &str, min_score: f64) -> Vec<SearchHit<'_>> {
        search(&self.store, query, min_score)
    }

    /// Forced refresh: clear the store, the processed-file cache, the learned
    /// patterns and the progress snapshot.
    pub fn refresh(&mut self) {
        info!(
            entries = self.store.len(),
            processed = self.processed.len(),
            "refreshing knowledge session"
        );
        self.store.clear();
        self.processed.clear();
        self.patterns.clear();
        self.progress = ScanProgress::default();
        self.degraded = false;
    }

    pub fn seed_fallback(&mut self) {
        self.store.extend(fallback_entries());
    }

    /// Refresh, then explore `repo`.
    ///
    /// When exploration yields nothing and `seed_fallback` is set, the
    /// fallback dataset is seeded and the session is marked degraded.
    pub async fn load_repository(
        &mut self,
        explorer: &Explorer,
        repo: &RepoCoordinate,
        seed_fallback: bool,
    ) -> ExploreReport {
        self.refresh();
        let report = explorer.explore(self, repo).await;
        if !report.found_any && seed_fallback {
            warn!(repo = %repo, "exploration found nothing; using fallback dataset");
            self.seed_fallback();
            self.mark_degraded();
        }
        report
    }

    /// Overwrite `last_updated` and set `metadata.author` from version
    /// control, querying each distinct file path once.
    ///
    /// Failures leave that path's entries unchanged. Returns the number of
    /// paths enriched.
    pub async fn enrich_history(&mut self, provider: &dyn HistoryProvider) -> usize {
        let paths: Vec<String> = {
            let mut seen = HashSet::new();
            self.store
                .entries()
                .iter()
                .filter(|e| seen.insert(e.file_path.as_str()))
                .map(|e| e.file_path.clone())
                .collect()
        };

        let mut found = HashMap::new();
        for path in paths {
            match provider.last_change(&path).await {
                Ok(Some(history)) => {
                    found.insert(path, history);
                }
                Ok(None) => debug!(path = %path, "no history"),
                Err(e) => warn!(path = %path, error = %e, "history lookup failed"),
            }
        }

        for entry in self.store.entries_mut() {
            if let Some(h) = found.get(&entry.file_path) {
                entry.last_updated = h.date;
                entry
                    .metadata
                    .insert("author".to_string(), h.author.clone());
            }
        }
        found.len()
    }
}
