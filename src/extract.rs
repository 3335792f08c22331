//! Heuristic content extraction.
//!
//! Decomposes raw source text into comments, function signatures, exports,
//! classes, API routes, background jobs, literal text runs and flat
//! key/value blocks. This is pattern matching, not parsing: recall matters
//! more than precision because retrieval downstream is itself approximate.
//!
//! The [`Extractor`] trait is the seam where a stricter, syntax-aware
//! implementation can replace [`PatternExtractor`] without touching the rest
//! of the pipeline.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Comments shorter than this are noise.
pub const MIN_COMMENT_CHARS: usize = 5;
/// Text runs shorter than this are noise.
pub const MIN_TEXT_CHARS: usize = 3;
/// Upper bound on a captured function body.
pub const MAX_BODY_CHARS: usize = 500;
/// Upper bound on a captured literal/export value.
const MAX_VALUE_CHARS: usize = 200;

/// A named function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub name: String,
    pub params: String,
    pub body: Option<String>,
    /// 1-based line of the declaration.
    pub line_start: usize,
    pub line_end: usize,
}

/// A named export binding (`name → declaring statement`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBinding {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub extends: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoute {
    /// Uppercase HTTP method (`GET`, `POST`, ... or `USE` for mounts).
    pub method: String,
    pub route: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Schedule,
    Handler,
    Queue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub kind: JobKind,
    pub name: String,
    pub line: usize,
}

/// An ordered run of flat key/value pairs.
pub type KeyValueBlock = Vec<(String, String)>;

/// Everything found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub doc_comments: Vec<String>,
    pub inline_comments: Vec<String>,
    pub functions: Vec<FunctionSig>,
    pub exports: Vec<ExportBinding>,
    pub classes: Vec<ClassDecl>,
    pub api_routes: Vec<ApiRoute>,
    pub jobs: Vec<JobRef>,
    pub text_content: Vec<String>,
    pub structured_data: Vec<KeyValueBlock>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.doc_comments.is_empty()
            && self.inline_comments.is_empty()
            && self.functions.is_empty()
            && self.exports.is_empty()
            && self.classes.is_empty()
            && self.api_routes.is_empty()
            && self.jobs.is_empty()
            && self.text_content.is_empty()
            && self.structured_data.is_empty()
    }
}

/// Turns raw file text into an [`Extraction`].
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    /// Best-effort decomposition. Must not fail: unrecognized input yields
    /// an empty extraction.
    fn extract(&self, content: &str, file_path: &str) -> Extraction;
}

/// Regex and line-scanning extractor for common web/backend languages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl Extractor for PatternExtractor {
    fn name(&self) -> &str {
        "pattern"
    }

    fn extract(&self, content: &str, file_path: &str) -> Extraction {
        let ext = extension(file_path);
        let lines = LineIndex::new(content);

        let mut out = Extraction::default();
        if ext == "json" {
            out.structured_data = json_blocks(content);
            return out;
        }

        let config_like = matches!(ext.as_str(), "yaml" | "yml" | "toml" | "env" | "ini");
        let markdown = ext == "md";

        if !markdown {
            let (docs, inline) = comments(content, config_like);
            out.doc_comments = docs;
            out.inline_comments = inline;
        }
        if !config_like && !markdown {
            out.functions = functions(content, &lines);
            out.exports = exports(content);
            out.classes = classes(content, &lines);
            out.api_routes = api_routes(content, file_path, &lines);
            out.jobs = jobs(content, &lines);
        }
        out.text_content = text_runs(content, &ext);
        out.structured_data = key_value_blocks(content, config_like);
        out
    }
}

fn extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.starts_with(".env") {
        return "env".to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Byte offset → 1-based line number.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(content: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============ Comments ============

static DOC_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*\*(.*?)\*/").unwrap());
static PY_DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"""(.*?)""""#).unwrap());

fn clean_doc_block(raw: &str) -> String {
    raw.lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn comments(content: &str, config_like: bool) -> (Vec<String>, Vec<String>) {
    let mut docs = Vec::new();
    let mut seen = HashSet::new();
    let mut push_doc = |text: String, docs: &mut Vec<String>| {
        if text.chars().count() >= MIN_COMMENT_CHARS && seen.insert(text.clone()) {
            docs.push(text);
        }
    };

    for cap in DOC_BLOCK.captures_iter(content) {
        push_doc(clean_doc_block(&cap[1]), &mut docs);
    }
    for cap in PY_DOCSTRING.captures_iter(content) {
        push_doc(collapse_ws(&cap[1]), &mut docs);
    }

    // `///` and `//!` runs form one doc comment each.
    let mut run: Vec<&str> = Vec::new();
    let mut inline = Vec::new();
    let mut inline_seen = HashSet::new();
    for line in content.lines() {
        let t = line.trim_start();
        if let Some(rest) = t.strip_prefix("///").or_else(|| t.strip_prefix("//!")) {
            run.push(rest.trim());
            continue;
        }
        if !run.is_empty() {
            push_doc(run.join(" ").trim().to_string(), &mut docs);
            run.clear();
        }

        let text = if let Some(rest) = t.strip_prefix("//") {
            Some(rest.trim())
        } else if let Some(rest) = t.strip_prefix("# ") {
            // `#` comments only outside C-like preprocessor/attribute syntax
            Some(rest.trim())
        } else if config_like {
            t.strip_prefix('#').map(str::trim)
        } else {
            trailing_comment(line)
        };
        if let Some(text) = text {
            if text.chars().count() >= MIN_COMMENT_CHARS && inline_seen.insert(text.to_string()) {
                inline.push(text.to_string());
            }
        }
    }
    if !run.is_empty() {
        push_doc(run.join(" ").trim().to_string(), &mut docs);
    }

    (docs, inline)
}

/// `code(); // note` → `note`. Requires whitespace before `//` so URLs survive.
fn trailing_comment(line: &str) -> Option<&str> {
    let idx = line.find(" // ")?;
    let before = &line[..idx];
    // Inside a string literal: odd number of quotes before the marker.
    if before.matches('"').count() % 2 == 1 || before.matches('\'').count() % 2 == 1 {
        return None;
    }
    Some(line[idx + 4..].trim())
}

// ============ Functions ============

static JS_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[^\w.$])(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(([^)]*)\)")
        .unwrap()
});
static JS_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=\n]+?)?=\s*(?:async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*(?::\s*[^=\n]+?)?=>",
    )
    .unwrap()
});
static JS_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]+(?:(?:public|private|protected|static|async|override)\s+)*([A-Za-z_$][\w$]*)\s*\(([^)]*)\)\s*(?::\s*[^{;\n]+)?\{",
    )
    .unwrap()
});
static PY_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(([^)]*)\)").unwrap()
});
static RUST_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+\S+\s+)?fn\s+([A-Za-z_]\w*)\s*(?:<[^>]*>)?\s*\(([^)]*)\)",
    )
    .unwrap()
});
static GO_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*\(([^)]*)\)").unwrap()
});

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "else", "do", "try",
    "constructor", "super", "typeof", "new",
];

fn functions(content: &str, lines: &LineIndex) -> Vec<FunctionSig> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |name: &str, params: &str, start: usize, body: Option<(String, usize)>| {
        if CONTROL_KEYWORDS.contains(&name) {
            return;
        }
        let params = collapse_ws(params);
        if !seen.insert((name.to_string(), params.clone())) {
            return;
        }
        let line_start = lines.line_of(start);
        let (body, line_end) = match body {
            Some((text, end)) => (Some(text), lines.line_of(end)),
            None => (None, line_start),
        };
        out.push(FunctionSig {
            name: name.to_string(),
            params,
            body,
            line_start,
            line_end,
        });
    };

    for cap in JS_FUNCTION.captures_iter(content) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let params = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        push(name.as_str(), params, name.start(), brace_body(content, whole.end()));
    }
    for cap in JS_ARROW.captures_iter(content) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let params = cap
            .get(2)
            .or_else(|| cap.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");
        push(name.as_str(), params, name.start(), arrow_body(content, whole.end()));
    }
    for cap in RUST_FN
        .captures_iter(content)
        .chain(GO_FUNC.captures_iter(content))
        .chain(JS_METHOD.captures_iter(content))
    {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let params = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        push(name.as_str(), params, name.start(), brace_body(content, whole.end()));
    }
    for cap in PY_DEF.captures_iter(content) {
        let (Some(whole), Some(indent), Some(name)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        let params = cap.get(3).map(|m| m.as_str()).unwrap_or("");
        push(
            name.as_str(),
            params,
            name.start(),
            indented_body(content, whole.end(), indent.as_str().len()),
        );
    }

    out.sort_by_key(|f| f.line_start);
    out
}

/// Capture a `{ ... }` body starting at the first brace after `from`.
///
/// Returns the bounded body text and the byte offset where it ended.
fn brace_body(content: &str, from: usize) -> Option<(String, usize)> {
    let rest = content.get(from..)?;
    // The opening brace must come before the statement ends.
    let open = rest.find('{')?;
    if rest[..open].contains(';') || rest[..open].matches('\n').count() > 2 {
        return None;
    }
    let body_start = from + open;
    scan_braces(content, body_start)
}

fn arrow_body(content: &str, from: usize) -> Option<(String, usize)> {
    let rest = content.get(from..)?;
    let trimmed = rest.trim_start();
    let offset = from + (rest.len() - trimmed.len());
    if trimmed.starts_with('{') {
        return scan_braces(content, offset);
    }
    // Expression body: up to the end of the statement.
    let end = trimmed.find([';', '\n']).unwrap_or(trimmed.len());
    let expr = trimmed[..end].trim();
    if expr.is_empty() {
        None
    } else {
        Some((truncate_chars(expr, MAX_BODY_CHARS), offset + end))
    }
}

/// Balanced-brace scan from an opening brace, bounded to [`MAX_BODY_CHARS`].
fn scan_braces(content: &str, open: usize) -> Option<(String, usize)> {
    let rest = content.get(open..)?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut prev = '\0';
    for (count, (i, c)) in rest.char_indices().enumerate() {
        if count >= MAX_BODY_CHARS {
            return Some((format!("{}…", &rest[..i]), open + i));
        }
        match quote {
            Some(q) => {
                if c == q && prev != '\\' {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let end = i + c.len_utf8();
                        return Some((rest[..end].to_string(), open + end));
                    }
                }
                _ => {}
            },
        }
        prev = c;
    }
    Some((rest.to_string(), content.len()))
}

/// Python-style body: following lines indented deeper than the `def`.
fn indented_body(content: &str, from: usize, def_indent: usize) -> Option<(String, usize)> {
    let rest = content.get(from..)?;
    let after_colon = rest.find(':').map(|i| i + 1)?;
    let mut body = String::new();
    let mut end = from + after_colon;
    let mut offset = from + after_colon;
    for line in rest[after_colon..].split_inclusive('\n').skip(1) {
        let indent = line.len() - line.trim_start().len();
        if !line.trim().is_empty() && indent <= def_indent {
            break;
        }
        body.push_str(line);
        offset += line.len();
        end = offset;
        if body.chars().count() >= MAX_BODY_CHARS {
            break;
        }
    }
    let body = body.trim_end();
    if body.trim().is_empty() {
        None
    } else {
        Some((truncate_chars(body, MAX_BODY_CHARS), end))
    }
}

// ============ Exports ============

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(?:const|let|var|function\*?|class|interface|type|enum)\s+([A-Za-z_$][\w$]*)[^\n]*",
    )
    .unwrap()
});
static EXPORT_DEFAULT_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap()
});
static EXPORT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s*(?:type\s*)?\{([^}]*)\}").unwrap());
static MODULE_EXPORTS_OBJ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"module\.exports\s*=\s*\{([^}]*)\}").unwrap());
static EXPORTS_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=[^\n]*").unwrap()
});
static RUST_PUB_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*pub\s+(?:struct|enum|trait|type|const|static|mod)\s+([A-Za-z_]\w*)[^\n]*")
        .unwrap()
});

fn exports(content: &str) -> Vec<ExportBinding> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |name: &str, value: &str| {
        if seen.insert(name.to_string()) {
            out.push(ExportBinding {
                name: name.to_string(),
                value: truncate_chars(value.trim().trim_end_matches('{').trim(), MAX_VALUE_CHARS),
            });
        }
    };

    for re in [&*EXPORT_DECL, &*EXPORT_DEFAULT_IDENT, &*EXPORTS_ASSIGN, &*RUST_PUB_ITEM] {
        for cap in re.captures_iter(content) {
            push(&cap[1], &cap[0]);
        }
    }
    for re in [&*EXPORT_LIST, &*MODULE_EXPORTS_OBJ] {
        for cap in re.captures_iter(content) {
            let statement = collapse_ws(&cap[0]);
            for item in cap[1].split(',') {
                let item = item.trim();
                // `a as b` exports `b`; `key: value` exports `key`
                let name = item
                    .rsplit(" as ")
                    .next()
                    .unwrap_or(item)
                    .split(':')
                    .next()
                    .unwrap_or(item)
                    .trim();
                if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                {
                    push(name, &statement);
                }
            }
        }
    }
    out
}

// ============ Classes ============

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s*<[^>]*>)?(?:\s+extends\s+([A-Za-z_$][\w$.]*)|\s*\(\s*([A-Za-z_][\w.]*))?",
    )
    .unwrap()
});

fn classes(content: &str, lines: &LineIndex) -> Vec<ClassDecl> {
    let mut seen = HashSet::new();
    CLASS_DECL
        .captures_iter(content)
        .filter_map(|cap| {
            let name = cap.get(1)?;
            if !seen.insert(name.as_str().to_string()) {
                return None;
            }
            Some(ClassDecl {
                name: name.as_str().to_string(),
                extends: cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .map(|m| m.as_str().to_string())
                    .filter(|b| b != "object"),
                line: lines.line_of(name.start()),
            })
        })
        .collect()
}

// ============ API routes ============

static ROUTER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:app|router|server|api|routes|fastify|bp|blueprint)\.(get|post|put|patch|delete|all|use)\(\s*['"`]([^'"`]+)['"`]"#,
    )
    .unwrap()
});
static ROUTE_DECORATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(Get|Post|Put|Patch|Delete|All)\(\s*['"`]?([^'"`)]*)['"`]?\s*\)"#).unwrap()
});
static FLASK_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@\w+\.route\(\s*['"]([^'"]+)['"](?:[^)\n]*methods\s*=\s*\[([^\]]*)\])?"#).unwrap()
});
static RUST_ROUTE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#\[(get|post|put|patch|delete)\(\s*"([^"]+)""#).unwrap()
});
static HANDLER_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*export\s+(?:async\s+)?(?:function|const)\s+(GET|POST|PUT|PATCH|DELETE)\b")
        .unwrap()
});

fn api_routes(content: &str, file_path: &str, lines: &LineIndex) -> Vec<ApiRoute> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |method: &str, route: &str, at: usize| {
        let method = method.to_uppercase();
        let route = route.trim().to_string();
        if seen.insert((method.clone(), route.clone())) {
            out.push(ApiRoute {
                method,
                route,
                line: lines.line_of(at),
            });
        }
    };

    for re in [&*ROUTER_CALL, &*ROUTE_DECORATOR, &*RUST_ROUTE_ATTR] {
        for cap in re.captures_iter(content) {
            let at = cap.get(0).map(|m| m.start()).unwrap_or(0);
            let route = if cap[2].is_empty() { "/" } else { &cap[2] };
            push(&cap[1], route, at);
        }
    }
    for cap in FLASK_ROUTE.captures_iter(content) {
        let at = cap.get(0).map(|m| m.start()).unwrap_or(0);
        match cap.get(2) {
            Some(methods) => {
                for m in methods.as_str().split(',') {
                    let m = m.trim().trim_matches(['"', '\'']);
                    if !m.is_empty() {
                        push(m, &cap[1], at);
                    }
                }
            }
            None => push("GET", &cap[1], at),
        }
    }
    // File-system routed handlers (`app/api/users/route.ts` exporting `GET`)
    if let Some(route) = route_from_path(file_path) {
        for cap in HANDLER_EXPORT.captures_iter(content) {
            let at = cap.get(0).map(|m| m.start()).unwrap_or(0);
            push(&cap[1], &route, at);
        }
    }
    out
}

/// Derive `/api/...` from a file-system routed path, if it has an `api` segment.
fn route_from_path(file_path: &str) -> Option<String> {
    let segments: Vec<&str> = file_path.split('/').collect();
    let api_idx = segments.iter().position(|s| *s == "api")?;
    let mut parts: Vec<&str> = segments[api_idx..].to_vec();
    let file = parts.pop()?;
    let stem = file.split('.').next().unwrap_or(file);
    if stem != "route" && stem != "index" {
        parts.push(stem);
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("/{}", parts.join("/")))
}

// ============ Jobs ============

static JOB_SCHEDULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:cron\.schedule|schedule\.scheduleJob|new\s+CronJob|@Cron)\(\s*['"`]([^'"`]+)['"`]"#,
    )
    .unwrap()
});
static JOB_QUEUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"new\s+(?:Queue|Worker|Bull)\(\s*['"`]([^'"`]+)['"`]"#).unwrap()
});
static JOB_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.(?:process|define|every)\(\s*['"`]([^'"`]+)['"`]"#).unwrap()
});

fn jobs(content: &str, lines: &LineIndex) -> Vec<JobRef> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (kind, re) in [
        (JobKind::Schedule, &*JOB_SCHEDULE),
        (JobKind::Queue, &*JOB_QUEUE),
        (JobKind::Handler, &*JOB_HANDLER),
    ] {
        for cap in re.captures_iter(content) {
            let name = cap[1].trim().to_string();
            if seen.insert((kind, name.clone())) {
                out.push(JobRef {
                    kind,
                    name,
                    line: lines.line_of(cap.get(0).map(|m| m.start()).unwrap_or(0)),
                });
            }
        }
    }
    out
}

// ============ Literal text ============

static MARKUP_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<>{}\n]*[A-Za-z][^<>{}\n]*)<").unwrap());
static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\\\n]{3,200})""#).unwrap());
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^'\\\n]{3,200})'").unwrap());

fn text_runs(content: &str, ext: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |text: &str| {
        let text = collapse_ws(text);
        if text.chars().count() >= MIN_TEXT_CHARS && seen.insert(text.clone()) {
            out.push(text);
        }
    };

    if ext == "md" {
        for line in content.lines() {
            let t = line.trim().trim_start_matches('#').trim();
            if !t.is_empty() {
                push(t);
            }
        }
        return out;
    }

    if matches!(ext, "jsx" | "tsx" | "html" | "htm" | "vue" | "svelte") {
        for cap in MARKUP_TEXT.captures_iter(content) {
            push(&cap[1]);
        }
    }
    // Sentence-like literals only: identifiers, paths and import specifiers
    // have no spaces.
    for re in [&*DOUBLE_QUOTED, &*SINGLE_QUOTED] {
        for cap in re.captures_iter(content) {
            let s = cap[1].trim();
            if s.contains(' ') && s.chars().any(char::is_alphabetic) {
                push(s);
            }
        }
    }
    out
}

// ============ Structured data ============

static KV_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*["']?([A-Za-z_][\w.-]*)["']?\s*[:=]\s*(?:"([^"\n]*)"|'([^'\n]*)'|(-?\d+(?:\.\d+)?|true|false))\s*,?\s*$"#,
    )
    .unwrap()
});
static KV_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:-\s+)?["']?([A-Za-z_][\w.-]*)["']?\s*[:=]\s*([^#\n{}\[\]]+?)\s*$"#).unwrap()
});

/// Contiguous runs of `key: value` lines. A run needs at least two pairs.
fn key_value_blocks(content: &str, config_like: bool) -> Vec<KeyValueBlock> {
    let mut blocks = Vec::new();
    let mut current: KeyValueBlock = Vec::new();

    let flush = |current: &mut KeyValueBlock, blocks: &mut Vec<KeyValueBlock>| {
        if current.len() >= 2 {
            blocks.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for line in content.lines() {
        let pair = if let Some(cap) = KV_QUOTED.captures(line) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            Some((cap[1].to_string(), value.to_string()))
        } else if config_like {
            KV_BARE.captures(line).map(|cap| {
                (
                    cap[1].to_string(),
                    cap[2].trim().trim_matches(['"', '\'']).to_string(),
                )
            })
        } else {
            None
        };

        match pair {
            Some((k, v)) => current.push((k, truncate_chars(&v, MAX_VALUE_CHARS))),
            None => {
                // Comments and blank lines inside config files don't break a block
                let t = line.trim();
                if config_like && (t.is_empty() || t.starts_with('#')) {
                    continue;
                }
                flush(&mut current, &mut blocks);
            }
        }
    }
    flush(&mut current, &mut blocks);
    blocks
}

/// Top-level scalar members of a JSON object, plus one block per nested
/// object of scalars.
fn json_blocks(content: &str) -> Vec<KeyValueBlock> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(content)
    else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    let mut top: KeyValueBlock = Vec::new();
    for (key, value) in &map {
        match value {
            serde_json::Value::Object(inner) => {
                let nested: KeyValueBlock = inner
                    .iter()
                    .filter_map(|(k, v)| scalar(v).map(|s| (format!("{}.{}", key, k), s)))
                    .collect();
                if !nested.is_empty() {
                    blocks.push(nested);
                }
            }
            other => {
                if let Some(s) = scalar(other) {
                    top.push((key.clone(), s));
                }
            }
        }
    }
    if !top.is_empty() {
        blocks.insert(0, top);
    }
    blocks
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(truncate_chars(s, MAX_VALUE_CHARS)),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
