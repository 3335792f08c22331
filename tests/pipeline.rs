use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use repo_lens::answer::{Synthesizer, RETRIEVAL_CEILING};
use repo_lens::config::{ExplorerConfig, RetrievalConfig};
use repo_lens::error::{FetchError, FileFailure};
use repo_lens::explorer::Explorer;
use repo_lens::extract::{Extraction, Extractor};
use repo_lens::entry::{FILE_PREVIEW_CHARS, TRUNCATION_MARKER};
use repo_lens::fetcher::{join_path, ContentFetcher};
use repo_lens::generation::DisabledGenerator;
use repo_lens::history::{FileHistory, HistoryProvider};
use repo_lens::models::{AnswerMode, DirEntry, EntryKind, EntryType, FilePayload, RepoCoordinate};
use repo_lens::processor::FileOutcome;
use repo_lens::progress::ScanStatus;
use repo_lens::session::KnowledgeSession;

/// Repository held in memory. Directories are implied by file paths.
struct MemoryFetcher {
    files: BTreeMap<String, String>,
    broken: HashSet<String>,
    base64: bool,
    fetches: Arc<AtomicUsize>,
}

impl MemoryFetcher {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            broken: HashSet::new(),
            base64: false,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn broken(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }

    fn base64(mut self) -> Self {
        self.base64 = true;
        self
    }
}

#[async_trait]
impl ContentFetcher for MemoryFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for file in self.files.keys() {
            if let Some(rest) = file.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        children.insert(dir.to_string(), EntryKind::Dir);
                    }
                    None => {
                        children.entry(rest.to_string()).or_insert(EntryKind::File);
                    }
                }
            }
        }
        if children.is_empty() {
            return Err(FetchError::NotFound(path.to_string()));
        }
        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry {
                path: join_path(path, &name),
                name,
                kind,
            })
            .collect())
    }

    async fn get_file_content(&self, path: &str) -> Result<FilePayload, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(path) {
            return Err(FetchError::Network(format!("{}: connection reset", path)));
        }
        let content = self
            .files
            .get(path)
            .ok_or_else(|| FetchError::NotFound(path.to_string()))?;
        if self.base64 {
            Ok(FilePayload::base64(
                base64::engine::general_purpose::STANDARD.encode(content),
            ))
        } else {
            Ok(FilePayload::utf8(content.clone()))
        }
    }
}

/// Every listing is refused.
struct LockedFetcher;

#[async_trait]
impl ContentFetcher for LockedFetcher {
    fn name(&self) -> &str {
        "locked"
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        Err(FetchError::AccessDenied(path.to_string()))
    }

    async fn get_file_content(&self, path: &str) -> Result<FilePayload, FetchError> {
        Err(FetchError::AccessDenied(path.to_string()))
    }
}

const BILLING: &str = r#"/**
 * Charges a member's stored card for an open invoice.
 */
export async function chargeInvoice(invoice, member) {
  const intent = await stripe.paymentIntents.create({ amount: invoice.total });
  return intent.status;
}
"#;

const ROUTES: &str = r#"import { chargeInvoice } from '../services/billing';

router.post('/api/invoices/:id/charge', async (req, res) => {
  res.json(await chargeInvoice(req.invoice, req.member));
});
"#;

fn sample_repo() -> MemoryFetcher {
    MemoryFetcher::new(&[
        ("package.json", r#"{"name": "billing-app", "version": "1.0.0", "private": true}"#),
        ("assets/logo.png", "binary"),
        ("src/api/invoices.ts", ROUTES),
        ("src/broken.ts", "export const never = 'fetched';"),
        ("src/services/billing.ts", BILLING),
    ])
    .broken("src/broken.ts")
}

fn repo() -> RepoCoordinate {
    RepoCoordinate::new("billing-app")
}

fn explorer(fetcher: impl ContentFetcher + 'static) -> Explorer {
    explorer_with(fetcher, ExplorerConfig::default())
}

fn explorer_with(fetcher: impl ContentFetcher + 'static, config: ExplorerConfig) -> Explorer {
    Explorer::new(Box::new(fetcher), &config).unwrap()
}

#[tokio::test]
async fn exploration_indexes_code_and_isolates_failures() {
    let ex = explorer(sample_repo());
    let mut session = KnowledgeSession::new();
    let report = ex.explore(&mut session, &repo()).await;

    assert!(report.found_any);
    assert_eq!(report.failed_files(), 1);
    let failed = report
        .all_files()
        .find(|(p, _)| p == "src/broken.ts")
        .map(|(_, o)| o.clone())
        .unwrap();
    assert!(matches!(failed, FileOutcome::Failed(FileFailure::Fetch(FetchError::Network(_)))));

    // failed files are still cached
    assert!(session.is_processed("src/broken.ts"));
    assert!(session.is_processed("src/services/billing.ts"));
    assert!(session.is_processed("src/api/invoices.ts"));
    assert!(!session.is_processed("assets/logo.png"));

    let types: HashSet<EntryType> = session
        .store()
        .entries()
        .iter()
        .map(|e| e.entry_type)
        .collect();
    assert!(types.contains(&EntryType::Comment));
    assert!(types.contains(&EntryType::Function));
    assert!(types.contains(&EntryType::ApiRoute));
    assert!(types.contains(&EntryType::StructuredData));

    assert_eq!(session.progress().status, ScanStatus::Complete);
    assert_eq!(session.progress().files_processed, 3);
    assert!(!session.progress().connection_errors.is_empty());
}

#[tokio::test]
async fn no_accessible_paths_leaves_store_untouched() {
    let ex = explorer(LockedFetcher);
    let mut session = KnowledgeSession::new();
    let report = ex.explore(&mut session, &repo()).await;

    assert!(!report.found_any);
    assert!(session.store().is_empty());
    assert!(session.patterns().is_empty());
    assert_eq!(report.failures.len(), report.candidates.len());
    assert_eq!(
        session.progress().connection_errors.len(),
        report.candidates.len()
    );
    assert_eq!(session.progress().status, ScanStatus::Error);
}

#[tokio::test]
async fn unreachable_repository_degrades_to_fallback() {
    let ex = explorer(LockedFetcher);
    let mut session = KnowledgeSession::new();
    let report = session.load_repository(&ex, &repo(), true).await;

    assert!(!report.found_any);
    assert!(session.is_degraded());
    assert!(!session.search("subscription payment", 0.1).is_empty());

    let config = RetrievalConfig::default();
    let answer = Synthesizer::new(&DisabledGenerator, &config)
        .answer(&session, "How does subscription payment work?")
        .await;
    assert_eq!(answer.mode, AnswerMode::Retrieval);
    assert!(answer.warning.unwrap().contains("fallback"));
}

#[tokio::test]
async fn process_file_is_at_most_once() {
    let fetcher = sample_repo();
    let fetches = fetcher.fetches.clone();
    let ex = explorer(fetcher);
    let processor = ex.processor();
    let mut session = KnowledgeSession::new();

    let first = processor
        .process_file(&mut session, "src/services/billing.ts")
        .await;
    let len = session.store().len();
    let second = processor
        .process_file(&mut session, "src/services/billing.ts")
        .await;

    assert!(matches!(first, FileOutcome::Processed { entries } if entries == len));
    assert_eq!(second, FileOutcome::AlreadyProcessed);
    assert_eq!(session.store().len(), len);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversized_file_is_cached_without_entries() {
    let huge = "a".repeat(150_000);
    let ex = explorer(MemoryFetcher::new(&[("src/huge.ts", huge.as_str())]));
    let mut session = KnowledgeSession::new();

    let outcome = ex.processor().process_file(&mut session, "src/huge.ts").await;
    assert_eq!(outcome, FileOutcome::SkippedTooLarge { chars: 150_000 });
    assert!(session.is_processed("src/huge.ts"));
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn base64_payloads_are_decoded() {
    let ex = explorer(MemoryFetcher::new(&[("src/services/billing.ts", BILLING)]).base64());
    let mut session = KnowledgeSession::new();

    let outcome = ex
        .processor()
        .process_file(&mut session, "src/services/billing.ts")
        .await;
    assert!(outcome.succeeded());
    assert!(session
        .store()
        .entries()
        .iter()
        .any(|e| e.content.contains("chargeInvoice")));
}

#[tokio::test]
async fn refresh_refetches_everything() {
    let fetcher = sample_repo();
    let fetches = fetcher.fetches.clone();
    let ex = explorer(fetcher);
    let mut session = KnowledgeSession::new();

    session.load_repository(&ex, &repo(), false).await;
    let first_run = fetches.load(Ordering::SeqCst);
    let entries = session.store().len();
    let patterns = session.patterns().to_vec();
    assert_eq!(first_run, 4);

    session.load_repository(&ex, &repo(), false).await;
    assert_eq!(fetches.load(Ordering::SeqCst), first_run * 2);
    assert_eq!(session.store().len(), entries);
    assert_eq!(session.patterns(), patterns.as_slice());
}

#[tokio::test]
async fn second_run_without_refresh_tries_learned_paths_first() {
    let ex = explorer(sample_repo());
    let mut session = KnowledgeSession::new();
    ex.explore(&mut session, &repo()).await;

    let learned = session.patterns().to_vec();
    assert!(learned.contains(&"src".to_string()));
    let candidates = ex.candidates(session.patterns(), &repo());
    assert_eq!(&candidates[..learned.len()], learned.as_slice());

    // everything is cached, so nothing new is stored
    let before = session.store().len();
    let report = ex.explore(&mut session, &repo()).await;
    assert!(report.found_any);
    assert_eq!(session.store().len(), before);
}

#[tokio::test]
async fn answers_cite_explored_files() {
    let ex = explorer(sample_repo());
    let mut session = KnowledgeSession::new();
    ex.explore(&mut session, &repo()).await;

    let config = RetrievalConfig::default();
    let answer = Synthesizer::new(&DisabledGenerator, &config)
        .answer(&session, "charge invoice")
        .await;

    assert_eq!(answer.mode, AnswerMode::Retrieval);
    assert!(answer.confidence <= RETRIEVAL_CEILING);
    assert!(answer
        .references
        .iter()
        .any(|r| r.file_path == "src/services/billing.ts"));
    let paths: Vec<&str> = answer.references.iter().map(|r| r.file_path.as_str()).collect();
    let unique: HashSet<&str> = paths.iter().copied().collect();
    assert_eq!(paths.len(), unique.len());
}

struct WholeFileOnly;

impl Extractor for WholeFileOnly {
    fn name(&self) -> &str {
        "whole-file"
    }

    fn extract(&self, _content: &str, _file_path: &str) -> Extraction {
        Extraction::default()
    }
}

#[tokio::test]
async fn extractor_is_pluggable() {
    let ex = explorer(sample_repo()).with_extractor(Box::new(WholeFileOnly));
    let mut session = KnowledgeSession::new();
    let report = ex.explore(&mut session, &repo()).await;

    assert!(report.found_any);
    assert!(session.store().entries().iter().all(|e| {
        e.entry_type == EntryType::TextContent
            && e.metadata.get("category").map(String::as_str) == Some("file")
    }));
    assert_eq!(session.store().len(), 3);
}

#[tokio::test]
async fn sessions_do_not_share_state() {
    let ex = explorer(sample_repo());
    let mut a = KnowledgeSession::new();
    let b = KnowledgeSession::new();
    ex.explore(&mut a, &repo()).await;

    assert!(!a.store().is_empty());
    assert!(b.store().is_empty());
    assert!(b.patterns().is_empty());
    assert!(!b.is_processed("src/services/billing.ts"));
}

#[tokio::test]
async fn failed_fetch_is_not_a_success_when_listed_again() {
    // `src/broken.ts` is reached through the root's `src` module and again
    // through the `src` candidate.
    let fetcher = MemoryFetcher::new(&[("src/broken.ts", "export const never = 'fetched';")])
        .broken("src/broken.ts");
    let fetches = fetcher.fetches.clone();
    let ex = explorer(fetcher);
    let mut session = KnowledgeSession::new();
    let report = session.load_repository(&ex, &repo(), true).await;

    assert!(!report.found_any);
    assert_eq!(report.processed_files(), 0);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    let outcomes: Vec<&FileOutcome> = report
        .all_files()
        .filter(|(p, _)| p == "src/broken.ts")
        .map(|(_, o)| o)
        .collect();
    assert!(matches!(outcomes[0], FileOutcome::Failed(_)));
    assert_eq!(outcomes[1], &FileOutcome::AlreadyAttempted);

    assert!(session.patterns().is_empty());
    assert!(session.is_degraded());
    assert!(!session.store().is_empty());
    assert_eq!(session.progress().status, ScanStatus::Error);
}

#[tokio::test]
async fn module_processing_stops_at_max_depth() {
    let ex = explorer_with(
        MemoryFetcher::new(&[
            ("api/routes.ts", ROUTES),
            ("api/services/billing.ts", BILLING),
            ("api/services/models/invoice.ts", "export interface Invoice { total: number }"),
        ]),
        ExplorerConfig {
            max_depth: 2,
            ..Default::default()
        },
    );
    let mut session = KnowledgeSession::new();
    let module = ex.processor().process_module(&mut session, "api", 1).await;

    assert_eq!(module.listings, 2);
    assert!(session.is_processed("api/routes.ts"));
    assert!(session.is_processed("api/services/billing.ts"));
    assert!(!session.is_processed("api/services/models/invoice.ts"));
}

#[tokio::test]
async fn module_listing_forwards_at_most_max_files_per_dir() {
    let files: Vec<(String, String)> = (0..20)
        .map(|i| (format!("api/handler{:02}.ts", i), format!("export const route{} = '/v1';", i)))
        .collect();
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let fetcher = MemoryFetcher::new(&borrowed);
    let fetches = fetcher.fetches.clone();
    let ex = explorer(fetcher);
    let mut session = KnowledgeSession::new();

    let module = ex.processor().process_module(&mut session, "api", 1).await;

    assert_eq!(module.files.len(), 15);
    assert_eq!(fetches.load(Ordering::SeqCst), 15);
    assert!(session.is_processed("api/handler14.ts"));
    assert!(!session.is_processed("api/handler15.ts"));
}

#[tokio::test]
async fn long_doc_blocks_become_bounded_entries() {
    let doc = format!("/**\n * {}\n */\nexport function renew() {{}}\n", "renewal ".repeat(10_000));
    let ex = explorer(MemoryFetcher::new(&[("src/renewals.ts", doc.as_str())]));
    let mut session = KnowledgeSession::new();

    let outcome = ex.processor().process_file(&mut session, "src/renewals.ts").await;
    assert!(outcome.succeeded());

    let limit = FILE_PREVIEW_CHARS + TRUNCATION_MARKER.chars().count();
    let entries = session.store().entries();
    assert!(entries.iter().all(|e| e.content.chars().count() <= limit));
    assert!(entries
        .iter()
        .any(|e| e.entry_type == EntryType::Comment && e.content.ends_with(TRUNCATION_MARKER)));
}

/// History keyed by path; records every lookup.
struct StubHistory {
    known: HashMap<String, FileHistory>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl HistoryProvider for StubHistory {
    async fn last_change(&self, path: &str) -> Result<Option<FileHistory>> {
        self.calls.lock().unwrap().push(path.to_string());
        if self.failing.contains(path) {
            bail!("git log failed for {}", path);
        }
        Ok(self.known.get(path).cloned())
    }
}

#[tokio::test]
async fn history_enrichment_sets_author_once_per_path() {
    let ex = explorer(sample_repo());
    let mut session = KnowledgeSession::new();
    ex.explore(&mut session, &repo()).await;

    let date: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-02T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let history = StubHistory {
        known: HashMap::from([(
            "src/services/billing.ts".to_string(),
            FileHistory {
                author: "Grace Hopper".to_string(),
                date,
            },
        )]),
        failing: HashSet::from(["src/api/invoices.ts".to_string()]),
        calls: Mutex::new(Vec::new()),
    };
    let before: HashMap<String, DateTime<Utc>> = session
        .store()
        .entries()
        .iter()
        .map(|e| (e.id.clone(), e.last_updated))
        .collect();

    let enriched = session.enrich_history(&history).await;
    assert_eq!(enriched, 1);

    let calls = history.calls.lock().unwrap().clone();
    let distinct: HashSet<&String> = calls.iter().collect();
    assert_eq!(calls.len(), distinct.len());
    assert!(distinct.contains(&"src/services/billing.ts".to_string()));
    assert!(distinct.contains(&"src/api/invoices.ts".to_string()));

    for e in session.store().entries() {
        if e.file_path == "src/services/billing.ts" {
            assert_eq!(e.last_updated, date);
            assert_eq!(e.metadata.get("author").map(String::as_str), Some("Grace Hopper"));
        } else {
            assert_eq!(e.last_updated, before[&e.id]);
            assert!(!e.metadata.contains_key("author"));
        }
    }
}
