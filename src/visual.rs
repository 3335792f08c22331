//! Rule-based diagram suggestions for answers.
//!
//! The query is matched against fixed keyword families in priority order;
//! the first family that matches yields a canned Mermaid diagram. When no
//! family matches, a generic flow is built from the retrieved entries:
//! function/export/class names become nodes and import/require lines that
//! mention another node become edges. No edges means no diagram.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::models::{DiagramType, EntryType, KnowledgeEntry, VisualContext};

/// Generic flows are cut to this many edges.
const MAX_EDGES: usize = 12;

struct Family {
    terms: &'static [&'static str],
    diagram_type: DiagramType,
    syntax: &'static str,
}

const FAMILIES: &[Family] = &[
    Family {
        terms: &["subscription", "payment", "billing", "stripe", "checkout", "invoice"],
        diagram_type: DiagramType::Flowchart,
        syntax: "flowchart TD
    A[Member selects plan] --> B[Create checkout session]
    B --> C[Payment provider]
    C -->|Success| D[Webhook: payment succeeded]
    C -->|Failure| E[Webhook: payment failed]
    D --> F[Activate subscription]
    E --> G[Mark past due and notify]
    F --> H[Grant member access]",
    },
    Family {
        terms: &["content", "publish", "post", "article", "draft"],
        diagram_type: DiagramType::Flowchart,
        syntax: "flowchart TD
    A[Author writes draft] --> B[Save draft]
    B --> C{Review}
    C -->|Approved| D[Publish]
    C -->|Changes requested| A
    D --> E{Member tier allows access?}
    E -->|Yes| F[Show content]
    E -->|No| G[Show upgrade prompt]",
    },
    Family {
        terms: &["auth", "login", "logout", "signin", "signup", "password", "token"],
        diagram_type: DiagramType::Flowchart,
        syntax: "flowchart TD
    A[User] --> B[Login form]
    B --> C[Auth service]
    C --> D{Credentials valid?}
    D -->|Yes| E[Issue session token]
    D -->|No| F[Return error]
    E --> G[Access protected routes]",
    },
    Family {
        terms: &["architecture", "component", "structure", "overview", "system", "module"],
        diagram_type: DiagramType::Component,
        syntax: "graph TB
    subgraph Frontend
        UI[Pages and components]
    end
    subgraph Backend
        API[API routes]
        SVC[Services]
        JOBS[Background jobs]
    end
    DB[(Database)]
    EXT[External providers]
    UI --> API
    API --> SVC
    SVC --> DB
    SVC --> EXT
    JOBS --> SVC",
    },
    Family {
        terms: &["member", "state", "status", "lifecycle", "trial", "cancel"],
        diagram_type: DiagramType::State,
        syntax: "stateDiagram-v2
    [*] --> Free
    Free --> Trialing: start trial
    Free --> Active: subscribe
    Trialing --> Active: payment succeeded
    Active --> PastDue: payment failed
    PastDue --> Active: payment recovered
    PastDue --> Cancelled: retries exhausted
    Active --> Cancelled: member cancels
    Cancelled --> [*]",
    },
];

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^.*(?:\bimport\b|\brequire\s*\(|\bfrom\s+\S+\s+import\b|\buse\s+\w).*$").unwrap()
});

/// Suggest a diagram for `query`, or `None` when nothing applies.
pub fn visualize(query: &str, entries: &[&KnowledgeEntry]) -> Option<VisualContext> {
    if let Some(family) = match_family(query) {
        return Some(VisualContext {
            diagram_type: family.diagram_type,
            syntax: family.syntax.to_string(),
        });
    }
    generic_flow(entries)
}

fn match_family(query: &str) -> Option<&'static Family> {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    FAMILIES
        .iter()
        .find(|f| f.terms.iter().any(|term| tokens.iter().any(|t| t.starts_with(term))))
}

fn generic_flow(entries: &[&KnowledgeEntry]) -> Option<VisualContext> {
    // (name, defining file)
    let nodes: Vec<(&str, &str)> = entries
        .iter()
        .filter(|e| {
            matches!(
                e.entry_type,
                EntryType::Function | EntryType::Export | EntryType::Class
            )
        })
        .filter_map(|e| e.name().map(|n| (n, e.file_path.as_str())))
        .filter(|(n, _)| n.chars().count() > 2)
        .collect();
    if nodes.is_empty() {
        return None;
    }

    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    for entry in entries {
        let source = entry
            .name()
            .unwrap_or_else(|| entry.file_path.rsplit('/').next().unwrap_or(&entry.file_path));
        for line in IMPORT_LINE.find_iter(&entry.content) {
            for (target, target_file) in &nodes {
                if *target == source || *target_file == entry.file_path {
                    continue;
                }
                if contains_word(line.as_str(), target) {
                    edges.insert((source.to_string(), target.to_string()));
                }
            }
        }
    }
    if edges.is_empty() {
        return None;
    }

    let mut syntax = String::from("flowchart LR");
    for (from, to) in edges.iter().take(MAX_EDGES) {
        syntax.push_str(&format!(
            "\n    {}[{}] --> {}[{}]",
            node_id(from),
            label(from),
            node_id(to),
            label(to)
        ));
    }
    Some(VisualContext {
        diagram_type: DiagramType::Flowchart,
        syntax,
    })
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        let boundary = |c: Option<char>| c.map(|c| !(c.is_alphanumeric() || c == '_')).unwrap_or(true);
        boundary(before) && boundary(after)
    })
}

fn node_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn label(name: &str) -> String {
    name.replace(['[', ']', '"'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryBuilder;

    #[test]
    fn authentication_question_gets_auth_flow() {
        let v = visualize("How does authentication work?", &[]).unwrap();
        assert_eq!(v.diagram_type, DiagramType::Flowchart);
        assert!(v.syntax.contains("Login form"));
    }

    #[test]
    fn families_follow_priority_order() {
        // payment outranks member state
        let v = visualize("member payment state", &[]).unwrap();
        assert!(v.syntax.contains("checkout"));
        let v = visualize("What is the system architecture?", &[]).unwrap();
        assert_eq!(v.diagram_type, DiagramType::Component);
        let v = visualize("member lifecycle", &[]).unwrap();
        assert_eq!(v.diagram_type, DiagramType::State);
    }

    #[test]
    fn unrelated_query_without_entries_is_none() {
        assert!(visualize("where is the logger configured", &[]).is_none());
    }

    #[test]
    fn generic_flow_from_imports() {
        let mailer = EntryBuilder::new(EntryType::Function, "src/lib/mailer.ts", "function sendMail(to)")
            .meta("name", "sendMail")
            .build();
        let worker = EntryBuilder::new(
            EntryType::TextContent,
            "src/workers/digest.ts",
            "import { sendMail } from '../lib/mailer';\nexport async function digest() {}",
        )
        .meta("name", "digest.ts")
        .build();

        let v = visualize("how are emails queued", &[&mailer, &worker]).unwrap();
        assert_eq!(v.diagram_type, DiagramType::Flowchart);
        assert!(v.syntax.starts_with("flowchart LR"));
        assert!(v.syntax.contains("digest_ts[digest.ts] --> sendMail[sendMail]"));
    }

    #[test]
    fn generic_flow_needs_an_edge() {
        let lone = EntryBuilder::new(EntryType::Function, "src/a.ts", "function helper() {}")
            .meta("name", "helper")
            .build();
        assert!(visualize("how is the cache warmed", &[&lone]).is_none());
    }

    #[test]
    fn word_boundaries() {
        assert!(contains_word("import { sendMail } from", "sendMail"));
        assert!(!contains_word("import { sendMailLater }", "sendMail"));
    }
}
