//! Knowledge entry construction.
//!
//! Turns an [`Extraction`] into typed [`KnowledgeEntry`] values and builds
//! the whole-file entry every non-trivial file gets.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::extract::{Extraction, JobKind};
use crate::keywords::{keywords_from_path, keywords_from_text};
use crate::models::{EntryType, KnowledgeEntry};

/// Whole-file previews are cut to this many characters.
pub const FILE_PREVIEW_CHARS: usize = 2000;
pub const TRUNCATION_MARKER: &str = "\n… [truncated]";
/// Files at or below this many characters get no whole-file entry.
pub const MIN_FILE_CHARS: usize = 10;
/// Extracted fragments (comments, text runs, bodies, data blocks) are cut to
/// this many characters.
pub const FRAGMENT_CHARS: usize = 1000;

/// `text` cut to `max` characters, with [`TRUNCATION_MARKER`] appended when
/// anything was dropped.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn fragment(text: &str) -> String {
    truncate_chars(text, FRAGMENT_CHARS)
}

pub struct EntryBuilder {
    entry_type: EntryType,
    file_path: String,
    content: String,
    keywords: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
}

impl EntryBuilder {
    pub fn new(entry_type: EntryType, file_path: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            keywords: keywords_from_text(&content),
            entry_type,
            file_path: file_path.to_string(),
            content,
            metadata: BTreeMap::new(),
        }
    }

    pub fn meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn path_keywords(mut self) -> Self {
        self.keywords.extend(keywords_from_path(&self.file_path));
        self
    }

    pub fn keywords(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.keywords.extend(extra);
        self
    }

    pub fn build(self) -> KnowledgeEntry {
        KnowledgeEntry {
            id: Uuid::new_v4().to_string(),
            entry_type: self.entry_type,
            content: self.content,
            file_path: self.file_path,
            keywords: self.keywords,
            last_updated: Utc::now(),
            metadata: self.metadata,
        }
    }
}

/// Typed entries for every fragment of an extraction, in a fixed order:
/// comments, functions, exports, classes, routes, jobs, text, data.
pub fn entries_from_extraction(ex: &Extraction, file_path: &str) -> Vec<KnowledgeEntry> {
    let mut out = Vec::new();

    for doc in &ex.doc_comments {
        out.push(
            EntryBuilder::new(EntryType::Comment, file_path, fragment(doc))
                .meta("style", "doc")
                .build(),
        );
    }
    for comment in &ex.inline_comments {
        out.push(
            EntryBuilder::new(EntryType::Comment, file_path, fragment(comment))
                .meta("style", "inline")
                .build(),
        );
    }

    for f in &ex.functions {
        let mut content = format!("function {}({})", f.name, f.params);
        if let Some(ref body) = f.body {
            content.push('\n');
            content.push_str(body);
        }
        out.push(
            EntryBuilder::new(EntryType::Function, file_path, fragment(&content))
                .meta("name", f.name.as_str())
                .meta("params", f.params.as_str())
                .meta("line_start", f.line_start.to_string())
                .meta("line_end", f.line_end.to_string())
                .build(),
        );
    }

    for e in &ex.exports {
        out.push(
            EntryBuilder::new(EntryType::Export, file_path, fragment(&format!("export {}: {}", e.name, e.value)))
                .meta("name", e.name.as_str())
                .build(),
        );
    }

    for c in &ex.classes {
        let content = match c.extends {
            Some(ref base) => format!("class {} extends {}", c.name, base),
            None => format!("class {}", c.name),
        };
        let mut builder = EntryBuilder::new(EntryType::Class, file_path, content)
            .meta("name", c.name.as_str())
            .meta("line_start", c.line.to_string());
        if let Some(ref base) = c.extends {
            builder = builder.meta("extends", base.as_str());
        }
        out.push(builder.build());
    }

    for r in &ex.api_routes {
        let label = format!("{} {}", r.method, r.route);
        out.push(
            EntryBuilder::new(EntryType::ApiRoute, file_path, format!("api route {}", label))
                .meta("name", label)
                .meta("method", r.method.as_str())
                .meta("route", r.route.as_str())
                .meta("line_start", r.line.to_string())
                .keywords(["api".to_string(), "route".to_string()])
                .build(),
        );
    }

    for j in &ex.jobs {
        let (entry_type, prefix) = match j.kind {
            JobKind::Schedule => (EntryType::JobSchedule, "scheduled job"),
            JobKind::Handler => (EntryType::JobHandler, "job handler"),
            JobKind::Queue => (EntryType::JobQueue, "job queue"),
        };
        out.push(
            EntryBuilder::new(entry_type, file_path, format!("{}: {}", prefix, j.name))
                .meta("name", j.name.as_str())
                .meta("line_start", j.line.to_string())
                .build(),
        );
    }

    for text in &ex.text_content {
        out.push(
            EntryBuilder::new(EntryType::TextContent, file_path, fragment(text))
                .meta("category", "text")
                .build(),
        );
    }

    for block in &ex.structured_data {
        let content = block
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        out.push(
            EntryBuilder::new(EntryType::StructuredData, file_path, fragment(&content))
                .meta("pairs", block.len().to_string())
                .build(),
        );
    }

    out
}

/// The whole-file entry: bounded preview, path keywords and a content hash.
///
/// Returns `None` for content of [`MIN_FILE_CHARS`] characters or fewer.
pub fn file_entry(file_path: &str, content: &str) -> Option<KnowledgeEntry> {
    if content.trim().chars().count() <= MIN_FILE_CHARS {
        return None;
    }

    let preview = truncate_chars(content, FILE_PREVIEW_CHARS);
    let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
    let name = file_path.rsplit('/').next().unwrap_or(file_path);

    Some(
        EntryBuilder::new(EntryType::TextContent, file_path, preview)
            .path_keywords()
            .meta("category", "file")
            .meta("name", name)
            .meta("content_hash", hash)
            .meta("chars", content.chars().count().to_string())
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExportBinding, FunctionSig, JobRef};

    #[test]
    fn function_entry_carries_name_and_lines() {
        let ex = Extraction {
            functions: vec![FunctionSig {
                name: "renewMembership".into(),
                params: "memberId".into(),
                body: Some("{ return charge(memberId); }".into()),
                line_start: 3,
                line_end: 5,
            }],
            ..Default::default()
        };
        let entries = entries_from_extraction(&ex, "src/services/member.ts");
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.entry_type, EntryType::Function);
        assert_eq!(e.name(), Some("renewMembership"));
        assert_eq!(e.metadata.get("line_end").map(String::as_str), Some("5"));
        assert!(e.content.starts_with("function renewMembership(memberId)\n{"));
        assert!(e.keywords.contains("membership"));
        assert!(e.keywords.contains("charge"));
    }

    #[test]
    fn export_and_job_entries() {
        let ex = Extraction {
            exports: vec![ExportBinding {
                name: "stripeClient".into(),
                value: "export const stripeClient = new Stripe(key)".into(),
            }],
            jobs: vec![JobRef {
                kind: JobKind::Queue,
                name: "emails".into(),
                line: 1,
            }],
            ..Default::default()
        };
        let entries = entries_from_extraction(&ex, "src/lib/stripe.ts");
        assert_eq!(entries[0].entry_type, EntryType::Export);
        assert!(entries[0].keywords.contains("stripe"));
        assert_eq!(entries[1].entry_type, EntryType::JobQueue);
        assert_eq!(entries[1].content, "job queue: emails");
    }

    #[test]
    fn long_fragments_are_truncated() {
        let ex = Extraction {
            doc_comments: vec!["renewal ".repeat(10_000)],
            text_content: vec!["Welcome back".to_string()],
            ..Default::default()
        };
        let entries = entries_from_extraction(&ex, "src/docs.ts");
        let doc = &entries[0];
        assert!(doc.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            doc.content.chars().count(),
            FRAGMENT_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert!(doc.keywords.contains("renewal"));
        assert_eq!(entries[1].content, "Welcome back");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), format!("hé{}", TRUNCATION_MARKER));
        assert_eq!(truncate_chars("héllo", 5), "héllo");
    }

    #[test]
    fn ids_are_unique() {
        let a = EntryBuilder::new(EntryType::Comment, "a", "same text").build();
        let b = EntryBuilder::new(EntryType::Comment, "a", "same text").build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn file_entry_truncates_with_marker() {
        let content = "x".repeat(FILE_PREVIEW_CHARS + 50);
        let entry = file_entry("src/big/thing.ts", &content).unwrap();
        assert!(entry.content.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            entry.content.chars().count(),
            FILE_PREVIEW_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(entry.metadata.get("category").map(String::as_str), Some("file"));
        assert_eq!(entry.metadata["content_hash"].len(), 64);
        assert!(entry.keywords.contains("thing"));
        assert!(entry.keywords.contains("big"));
    }

    #[test]
    fn trivial_files_get_no_entry() {
        assert!(file_entry("a.ts", "  x = 1;  ").is_none());
        assert!(file_entry("a.ts", "export const answer = 42;").is_some());
    }
}
