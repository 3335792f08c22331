//! File and module processing.
//!
//! [`FileProcessor::process_file`] fetches one file, decodes it, extracts
//! knowledge entries and appends them to the session store. It is
//! at-most-once per path per session: the path is marked processed after
//! every attempt, whatever the outcome.
//!
//! [`FileProcessor::process_module`] walks a directory breadth-first,
//! forwarding qualifying files and following interest-matched
//! subdirectories down to the configured depth.
//!
//! Per-file failures never abort a module or an exploration. They are logged
//! and returned as a [`FileOutcome::Failed`] so callers can aggregate them.

use base64::Engine;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::config::ExplorerConfig;
use crate::entry::{entries_from_extraction, file_entry};
use crate::error::{FetchError, FileFailure};
use crate::extract::Extractor;
use crate::fetcher::ContentFetcher;
use crate::filter::PathFilter;
use crate::models::{EntryKind, FilePayload, PayloadEncoding};
use crate::progress::{ScanEvent, ScanProgressReporter};
use crate::session::KnowledgeSession;

/// Result of processing a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Content was extracted into `entries` new store entries.
    Processed { entries: usize },
    /// Cached: an earlier attempt in this session stored entries for it.
    AlreadyProcessed,
    /// Cached: an earlier attempt failed or produced nothing.
    AlreadyAttempted,
    /// Decoded content exceeded the size cap; nothing was extracted.
    SkippedTooLarge { chars: usize },
    /// Content was empty or too small to yield any entry.
    Empty,
    Failed(FileFailure),
}

impl FileOutcome {
    /// True when the file's entries are in the store, stored either by this
    /// call or by an earlier one in the same session. Failed, empty and
    /// oversized files never count, cached or not.
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            FileOutcome::Processed { .. } | FileOutcome::AlreadyProcessed
        )
    }
}

/// Aggregated result of [`FileProcessor::process_module`].
#[derive(Debug, Clone, Default)]
pub struct ModuleReport {
    pub path: String,
    /// Directory listings requested, including nested ones.
    pub listings: usize,
    pub files: Vec<(String, FileOutcome)>,
    pub errors: Vec<(String, FetchError)>,
}

impl ModuleReport {
    pub fn succeeded(&self) -> bool {
        self.files.iter().any(|(_, o)| o.succeeded())
    }
}

/// Stateless processing pipeline; all state lives on the session.
pub struct FileProcessor<'a> {
    pub(crate) fetcher: &'a dyn ContentFetcher,
    pub(crate) extractor: &'a dyn Extractor,
    pub(crate) filter: &'a PathFilter,
    pub(crate) config: &'a ExplorerConfig,
    pub(crate) reporter: &'a dyn ScanProgressReporter,
}

impl FileProcessor<'_> {
    pub async fn process_file(&self, session: &mut KnowledgeSession, path: &str) -> FileOutcome {
        if session.is_processed(path) {
            return if session.is_indexed(path) {
                FileOutcome::AlreadyProcessed
            } else {
                FileOutcome::AlreadyAttempted
            };
        }

        let outcome = self.fetch_and_extract(session, path).await;
        session.mark_processed(path, matches!(outcome, FileOutcome::Processed { .. }));

        match &outcome {
            FileOutcome::Processed { entries } => {
                let progress = session.progress_mut();
                progress.files_processed += 1;
                let files_processed = progress.files_processed;
                debug!(path, entries, "processed file");
                self.reporter.report(&ScanEvent::File {
                    path: path.to_string(),
                    files_processed,
                });
            }
            FileOutcome::SkippedTooLarge { chars } => {
                debug!(path, chars, "skipping oversized file");
            }
            FileOutcome::Failed(failure) => {
                warn!(path, error = %failure, "file produced nothing");
            }
            FileOutcome::Empty
            | FileOutcome::AlreadyProcessed
            | FileOutcome::AlreadyAttempted => {}
        }
        outcome
    }

    async fn fetch_and_extract(&self, session: &mut KnowledgeSession, path: &str) -> FileOutcome {
        let payload = match self.fetcher.get_file_content(path).await {
            Ok(p) => p,
            Err(e) => return FileOutcome::Failed(FileFailure::Fetch(e)),
        };
        let content = match decode_payload(payload) {
            Ok(c) => c,
            Err(msg) => return FileOutcome::Failed(FileFailure::Decode(msg)),
        };

        let chars = content.chars().count();
        if chars > self.config.max_file_chars {
            return FileOutcome::SkippedTooLarge { chars };
        }
        if content.trim().is_empty() {
            return FileOutcome::Empty;
        }

        let extraction = self.extractor.extract(&content, path);
        let mut entries = entries_from_extraction(&extraction, path);
        if let Some(whole) = file_entry(path, &content) {
            entries.push(whole);
        }
        if entries.is_empty() {
            return FileOutcome::Empty;
        }

        let count = entries.len();
        session.store_mut().extend(entries);
        FileOutcome::Processed { entries: count }
    }

    /// Process a directory and its interest-matched subdirectories.
    ///
    /// `depth` is the depth of `path` itself; nothing below
    /// `explorer.max_depth` is listed. At most `max_files_per_dir` files are
    /// forwarded from any one listing.
    pub async fn process_module(
        &self,
        session: &mut KnowledgeSession,
        path: &str,
        depth: usize,
    ) -> ModuleReport {
        let mut report = ModuleReport {
            path: path.to_string(),
            ..Default::default()
        };

        let mut queue = VecDeque::from([(path.to_string(), depth)]);
        while let Some((dir, depth)) = queue.pop_front() {
            if depth > self.config.max_depth {
                debug!(dir = %dir, depth, "max depth reached");
                continue;
            }

            report.listings += 1;
            {
                let progress = session.progress_mut();
                progress.total_attempts += 1;
                progress.current_directory = Some(dir.clone());
            }

            let listing = match self.fetcher.list_directory(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir, error = %e, "module listing failed");
                    session
                        .progress_mut()
                        .connection_errors
                        .push(format!("{}: {}", dir, e));
                    report.errors.push((dir, e));
                    continue;
                }
            };

            let mut forwarded = 0;
            for entry in listing {
                match entry.kind {
                    EntryKind::File => {
                        if forwarded >= self.config.max_files_per_dir
                            || !self.filter.is_source(&entry.path)
                        {
                            continue;
                        }
                        forwarded += 1;
                        let outcome = self.process_file(session, &entry.path).await;
                        report.files.push((entry.path, outcome));
                    }
                    EntryKind::Dir => {
                        if self.filter.is_interesting(&entry.name) {
                            queue.push_back((entry.path, depth + 1));
                        }
                    }
                }
            }
        }
        report
    }
}

/// Decode a fetcher payload into UTF-8 text.
///
/// Base64 payloads may contain embedded line breaks.
pub fn decode_payload(payload: FilePayload) -> Result<String, String> {
    match payload.encoding {
        PayloadEncoding::Utf8 => Ok(payload.content),
        PayloadEncoding::Base64 => {
            let compact: String = payload
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| format!("invalid base64: {}", e))?;
            String::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let payload = FilePayload::base64("ZXhwb3J0\nIGNvbnN0IHggPSAx\n");
        assert_eq!(decode_payload(payload).unwrap(), "export const x = 1");
    }

    #[test]
    fn rejects_bad_base64_and_binary() {
        assert!(decode_payload(FilePayload::base64("!!!not base64")).is_err());
        // 0xFF 0xFE is not UTF-8
        let err = decode_payload(FilePayload::base64("//4=")).unwrap_err();
        assert!(err.contains("UTF-8"));
    }

    #[test]
    fn outcome_success_classification() {
        assert!(FileOutcome::Processed { entries: 1 }.succeeded());
        assert!(FileOutcome::AlreadyProcessed.succeeded());
        assert!(!FileOutcome::AlreadyAttempted.succeeded());
        assert!(!FileOutcome::SkippedTooLarge { chars: 1 }.succeeded());
        assert!(!FileOutcome::Empty.succeeded());
        assert!(!FileOutcome::Failed(FileFailure::Decode("x".into())).succeeded());
    }
}
