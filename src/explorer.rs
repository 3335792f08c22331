//! Heuristic exploration of an unknown repository tree.
//!
//! The explorer never sees the whole tree. It walks an ordered list of
//! candidate directories:
//!
//! 1. paths learned earlier in this session (successful patterns),
//! 2. `explorer.extra_paths` from configuration,
//! 3. conventional source locations (root, `src`, `app`, `lib`, `api`, ...),
//!    some suffixed with the repository's own name.
//!
//! Each candidate is listed once. Recognized source files are processed
//! immediately and interest-matched subdirectories are processed as modules.
//! A candidate whose files or modules put content in the store becomes a
//! successful pattern, so later runs try it first.
//! Listing failures are logged and recorded in the progress snapshot, and the
//! walk moves on: no single failure aborts a run.

use anyhow::Result;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::ExplorerConfig;
use crate::error::FetchError;
use crate::extract::{Extractor, PatternExtractor};
use crate::fetcher::ContentFetcher;
use crate::filter::PathFilter;
use crate::models::{EntryKind, RepoCoordinate};
use crate::processor::{FileOutcome, FileProcessor, ModuleReport};
use crate::progress::{NoProgress, ScanEvent, ScanProgress, ScanProgressReporter, ScanStatus};
use crate::session::KnowledgeSession;

/// Conventional locations tried after learned and configured paths.
const STATIC_CANDIDATES: &[&str] = &[
    "",
    "src",
    "app",
    "lib",
    "api",
    "server",
    "services",
    "backend",
    "packages",
    "src/api",
    "src/services",
    "src/lib",
    "src/components",
    "src/pages",
    "app/api",
    "pages/api",
    "functions",
    "supabase/functions",
];

/// Outcome of one exploration run.
#[derive(Debug, Clone, Default)]
pub struct ExploreReport {
    /// Candidate paths in the order they were tried.
    pub candidates: Vec<String>,
    /// Every file outcome in visit order, from candidate listings and
    /// from modules alike. A path cached earlier in the run reappears as
    /// `AlreadyProcessed` or `AlreadyAttempted` after its first outcome.
    pub files: Vec<(String, FileOutcome)>,
    pub modules: Vec<ModuleReport>,
    /// Candidate listings that failed.
    pub failures: Vec<(String, FetchError)>,
    /// True iff at least one file was successfully processed.
    pub found_any: bool,
    pub duration: Duration,
}

impl ExploreReport {
    /// Every file outcome in visit order.
    pub fn all_files(&self) -> impl Iterator<Item = &(String, FileOutcome)> {
        self.files.iter()
    }

    pub fn processed_files(&self) -> usize {
        self.all_files()
            .filter(|(_, o)| matches!(o, FileOutcome::Processed { .. }))
            .count()
    }

    pub fn failed_files(&self) -> usize {
        self.all_files()
            .filter(|(_, o)| matches!(o, FileOutcome::Failed(_)))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.failures.len() + self.modules.iter().map(|m| m.errors.len()).sum::<usize>()
    }
}

/// Drives exploration against one repository through a [`ContentFetcher`].
pub struct Explorer {
    fetcher: Box<dyn ContentFetcher>,
    extractor: Box<dyn Extractor>,
    filter: PathFilter,
    config: ExplorerConfig,
    reporter: Box<dyn ScanProgressReporter>,
}

impl Explorer {
    /// An explorer using the pattern extractor and no progress output.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured globs are invalid.
    pub fn new(fetcher: Box<dyn ContentFetcher>, config: &ExplorerConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            extractor: Box::new(PatternExtractor),
            filter: PathFilter::new(config)?,
            config: config.clone(),
            reporter: Box::new(NoProgress),
        })
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ScanProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn fetcher_name(&self) -> &str {
        self.fetcher.name()
    }

    /// The processing pipeline bound to this explorer's collaborators.
    pub fn processor(&self) -> FileProcessor<'_> {
        FileProcessor {
            fetcher: self.fetcher.as_ref(),
            extractor: self.extractor.as_ref(),
            filter: &self.filter,
            config: &self.config,
            reporter: self.reporter.as_ref(),
        }
    }

    /// Ordered, deduplicated candidate list for `repo` given `learned` patterns.
    pub fn candidates(&self, learned: &[String], repo: &RepoCoordinate) -> Vec<String> {
        let mut seen = HashSet::new();
        let repo_specific = [repo.name.clone(), format!("src/{}", repo.name)];

        learned
            .iter()
            .cloned()
            .chain(self.config.extra_paths.iter().map(|p| p.trim_matches('/').to_string()))
            .chain(STATIC_CANDIDATES.iter().map(|s| s.to_string()))
            .chain(repo_specific.into_iter().filter(|p| !repo.name.is_empty() && !p.is_empty()))
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }

    /// Run one exploration over `repo`, populating `session`.
    pub async fn explore(&self, session: &mut KnowledgeSession, repo: &RepoCoordinate) -> ExploreReport {
        let started = Instant::now();
        let candidates = self.candidates(session.patterns(), repo);
        let total = candidates.len();
        info!(
            repo = %repo,
            fetcher = self.fetcher.name(),
            extractor = self.extractor.name(),
            candidates = total,
            "exploring repository"
        );

        {
            let successful_paths = session.patterns().len();
            *session.progress_mut() = ScanProgress {
                status: ScanStatus::Exploring,
                successful_paths,
                ..Default::default()
            };
        }

        let processor = self.processor();
        let mut report = ExploreReport {
            candidates: candidates.clone(),
            ..Default::default()
        };

        for (index, path) in candidates.iter().enumerate() {
            {
                let progress = session.progress_mut();
                progress.progress = ScanProgress::percent(index, total);
                progress.total_attempts += 1;
                progress.current_directory = Some(path.clone());
            }
            self.reporter.report(&ScanEvent::Candidate {
                path: path.clone(),
                index,
                total,
            });

            let listing = match self.fetcher.list_directory(path).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(path = %path, error = %e, "candidate not accessible");
                    session
                        .progress_mut()
                        .connection_errors
                        .push(format!("{}: {}", display_path(path), e));
                    report.failures.push((path.clone(), e));
                    continue;
                }
            };

            // Every source file in a candidate listing is processed; the
            // per-directory cap only applies inside modules.
            let mut yielded = false;
            for entry in listing {
                match entry.kind {
                    EntryKind::File => {
                        if !self.filter.is_source(&entry.path) {
                            continue;
                        }
                        let outcome = processor.process_file(session, &entry.path).await;
                        yielded |= outcome.succeeded();
                        report.files.push((entry.path, outcome));
                    }
                    EntryKind::Dir => {
                        if !self.filter.is_interesting(&entry.name) {
                            continue;
                        }
                        let module = processor.process_module(session, &entry.path, 1).await;
                        yielded |= module.succeeded();
                        report.files.extend(module.files.iter().cloned());
                        report.modules.push(module);
                    }
                }
            }
            if yielded {
                session.record_pattern(path);
            }
        }

        let found_any = report.all_files().any(|(_, o)| o.succeeded());
        report.found_any = found_any;
        report.duration = started.elapsed();

        let progress = session.progress_mut();
        progress.progress = 100;
        progress.current_directory = None;
        progress.scan_duration = report.duration.as_millis() as u64;
        progress.status = if report.found_any {
            ScanStatus::Complete
        } else {
            ScanStatus::Error
        };

        self.reporter.report(&ScanEvent::Finished {
            files_processed: report.processed_files(),
            errors: report.error_count(),
            duration_ms: progress.scan_duration,
        });
        info!(
            found_any = report.found_any,
            files = report.processed_files(),
            errors = report.error_count(),
            duration_ms = progress.scan_duration,
            "exploration finished"
        );
        report
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
