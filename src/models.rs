//! Core data models used throughout repo-lens.
//!
//! These types represent the knowledge entries, answers, and references that
//! flow through the exploration and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a [`KnowledgeEntry`].
///
/// Informational only: scoring never filters on the entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    Comment,
    Function,
    Export,
    Class,
    TextContent,
    StructuredData,
    ApiRoute,
    JobSchedule,
    JobHandler,
    JobQueue,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Comment => "comment",
            EntryType::Function => "function",
            EntryType::Export => "export",
            EntryType::Class => "class",
            EntryType::TextContent => "text-content",
            EntryType::StructuredData => "structured-data",
            EntryType::ApiRoute => "api-route",
            EntryType::JobSchedule => "job-schedule",
            EntryType::JobHandler => "job-handler",
            EntryType::JobQueue => "job-queue",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The atomic retrievable unit extracted from a repository file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// UUID, unique within a session.
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Bounded text shown to the user or fed to answer synthesis.
    pub content: String,
    /// Repository-relative origin path.
    pub file_path: String,
    /// Lowercase, deduplicated tokens. May be empty after stop-word filtering.
    pub keywords: BTreeSet<String>,
    /// Creation time, later overwritten by version-control history if enriched.
    pub last_updated: DateTime<Utc>,
    /// Free-form display metadata (`name`, `params`, `category`, `author`, ...).
    pub metadata: BTreeMap<String, String>,
}

impl KnowledgeEntry {
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").map(String::as_str)
    }

    pub fn author(&self) -> Option<&str> {
        self.metadata.get("author").map(String::as_str)
    }
}

/// A citation attached to an [`Answer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_numbers: Option<(usize, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Diagram flavour produced by the visual context generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Flowchart,
    Component,
    State,
}

/// A diagram description (Mermaid syntax) accompanying an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualContext {
    #[serde(rename = "type")]
    pub diagram_type: DiagramType,
    pub syntax: String,
}

/// How an [`Answer`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerMode {
    /// External generation succeeded, grounded on retrieved entries.
    Generated,
    /// Deterministic templated answer built from retrieved entries.
    Retrieval,
    /// Nothing matched the question.
    NoInformation,
}

/// A synthesized answer. Always produced, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Heuristic score in `[0, 1]`, not a calibrated probability.
    pub confidence: f64,
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_context: Option<VisualContext>,
    /// Soft, retryable warning (e.g. the generation call failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub mode: AnswerMode,
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a directory listing returned by a content fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    /// Repository-relative path with `/` separators.
    pub path: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::Dir,
        }
    }
}

/// Transport encoding of a fetched file payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Utf8,
    Base64,
}

/// Raw file content as delivered by a fetcher, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub content: String,
    pub encoding: PayloadEncoding,
}

impl FilePayload {
    pub fn utf8(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: PayloadEncoding::Utf8,
        }
    }

    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: PayloadEncoding::Base64,
        }
    }
}

/// Repository coordinate handed to the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoCoordinate {
    pub owner: Option<String>,
    /// Repository name; used to suffix candidate paths.
    pub name: String,
    pub branch: Option<String>,
}

impl RepoCoordinate {
    pub fn new(name: &str) -> Self {
        Self {
            owner: None,
            name: name.to_string(),
            branch: None,
        }
    }
}

impl fmt::Display for RepoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}/{}", owner, self.name),
            None => f.write_str(&self.name),
        }
    }
}
