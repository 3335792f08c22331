//! Answer synthesis.
//!
//! Turns ranked search hits into an [`Answer`]. Three paths:
//!
//! | Path | When | Confidence |
//! |------|------|------------|
//! | No information | no hits | exactly [`NO_INFO_CONFIDENCE`] |
//! | Generated | generator configured and the call succeeded | `min(0.3 + 0.05 × hits, 0.95)` |
//! | Retrieval | no generator, or the call failed | `min(0.1 + 0.05 × hits, 0.8)` |
//!
//! The generated ceiling is strictly above the retrieval ceiling so callers
//! can tell model-assisted answers from retrieval-only ones by confidence
//! alone. A failed generation call never surfaces as an error: the answer
//! falls back to retrieval and carries a [`Answer::warning`].

use std::collections::HashSet;
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::generation::Generator;
use crate::models::{Answer, AnswerMode, KnowledgeEntry, Reference};
use crate::search::SearchHit;
use crate::session::KnowledgeSession;
use crate::visual::visualize;

pub const NO_INFO_CONFIDENCE: f64 = 0.1;
pub const GENERATED_CEILING: f64 = 0.95;
pub const RETRIEVAL_CEILING: f64 = 0.8;
const GENERATED_BASE: f64 = 0.3;
const RETRIEVAL_BASE: f64 = 0.1;
const CONFIDENCE_STEP: f64 = 0.05;
/// Reference snippets are cut to this many characters.
pub const SNIPPET_CHARS: usize = 200;

const NO_INFO_TEXT: &str = "I couldn't find anything in the repository related to that question. \
Try different keywords, or refresh the session if the repository has changed.";

pub fn generated_confidence(hits: usize) -> f64 {
    (GENERATED_BASE + CONFIDENCE_STEP * hits as f64).min(GENERATED_CEILING)
}

pub fn retrieval_confidence(hits: usize) -> f64 {
    (RETRIEVAL_BASE + CONFIDENCE_STEP * hits as f64).min(RETRIEVAL_CEILING)
}

pub struct Synthesizer<'a> {
    generator: &'a dyn Generator,
    config: &'a RetrievalConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(generator: &'a dyn Generator, config: &'a RetrievalConfig) -> Self {
        Self { generator, config }
    }

    /// Answer `query` from the session's store. Never fails.
    pub async fn answer(&self, session: &KnowledgeSession, query: &str) -> Answer {
        let hits = session.search(query, self.config.min_score);
        let mut answer = self.answer_from_hits(query, &hits).await;

        if session.is_degraded() && answer.mode != AnswerMode::NoInformation {
            let note = "repository exploration found nothing; answering from the built-in fallback dataset";
            answer.warning = Some(match answer.warning.take() {
                Some(w) => format!("{}; {}", w, note),
                None => note.to_string(),
            });
        }
        answer
    }

    async fn answer_from_hits(&self, query: &str, hits: &[SearchHit<'_>]) -> Answer {
        if hits.is_empty() {
            return Answer {
                text: NO_INFO_TEXT.to_string(),
                confidence: NO_INFO_CONFIDENCE,
                references: Vec::new(),
                visual_context: None,
                warning: None,
                mode: AnswerMode::NoInformation,
            };
        }

        let mut warning = None;
        if self.generator.is_configured() {
            let used: Vec<&KnowledgeEntry> = hits
                .iter()
                .take(self.config.context_entries)
                .map(|h| h.entry)
                .collect();
            let prompt = build_prompt(query, &used);
            match self.generator.generate(&prompt).await {
                Ok(text) => {
                    return Answer {
                        text,
                        confidence: generated_confidence(hits.len()),
                        references: references(&used),
                        visual_context: visualize(query, &used),
                        warning: None,
                        mode: AnswerMode::Generated,
                    };
                }
                Err(e) => {
                    warn!(generator = self.generator.name(), error = %e, "generation failed; using retrieval answer");
                    warning = Some(format!(
                        "answer generation failed ({}); showing retrieval results instead",
                        e
                    ));
                }
            }
        }

        let used: Vec<&KnowledgeEntry> = hits
            .iter()
            .take(self.config.fallback_entries)
            .map(|h| h.entry)
            .collect();
        Answer {
            text: retrieval_text(query, &used, self.config.preview_chars),
            confidence: retrieval_confidence(hits.len()),
            references: references(&used),
            visual_context: visualize(query, &used),
            warning,
            mode: AnswerMode::Retrieval,
        }
    }
}

/// The question plus newline-separated grounding context.
pub fn build_prompt(query: &str, entries: &[&KnowledgeEntry]) -> String {
    let context = entries
        .iter()
        .map(|e| format!("File: {}\nType: {}\nContent:\n{}\n", e.file_path, e.entry_type, e.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Question: {}\n\nRepository context:\n\n{}\nAnswer the question using the context above.",
        query, context
    )
}

fn retrieval_text(query: &str, entries: &[&KnowledgeEntry], preview_chars: usize) -> String {
    let mut text = format!("Here is what the repository says about \"{}\":\n", query.trim());
    for e in entries {
        text.push_str(&format!(
            "\n**{}** ({})\n{}\n",
            e.file_path,
            e.entry_type,
            preview(&e.content, preview_chars)
        ));
    }

    let mut files: Vec<&str> = Vec::new();
    for e in entries {
        if !files.contains(&e.file_path.as_str()) {
            files.push(&e.file_path);
        }
    }
    text.push_str(&format!("\nSources: {}", files.join(", ")));
    text
}

fn preview(content: &str, max: usize) -> String {
    match content.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

/// One reference per distinct file, in first-use order.
pub fn references(entries: &[&KnowledgeEntry]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| seen.insert(e.file_path.as_str()))
        .map(|e| Reference {
            file_path: e.file_path.clone(),
            line_numbers: line_numbers(e),
            snippet: Some(preview(&e.content, SNIPPET_CHARS)),
            last_updated: Some(e.last_updated),
            author: e.author().map(str::to_string),
        })
        .collect()
}

fn line_numbers(entry: &KnowledgeEntry) -> Option<(usize, usize)> {
    let start: usize = entry.metadata.get("line_start")?.parse().ok()?;
    let end = entry
        .metadata
        .get("line_end")
        .and_then(|v| v.parse().ok())
        .unwrap_or(start);
    Some((start, end))
}
