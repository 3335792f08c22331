use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::RepoCoordinate;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    #[serde(default = "default_repo_provider")]
    pub provider: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_github_api")]
    pub api_base: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Local checkout root for the `local` provider.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts for rate-limited, 5xx and network failures.
    #[serde(default = "default_fetch_retries")]
    pub max_retries: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            provider: default_repo_provider(),
            owner: None,
            name: None,
            branch: None,
            api_base: default_github_api(),
            token_env: default_token_env(),
            root: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_fetch_retries(),
        }
    }
}

fn default_fetch_retries() -> u32 {
    2
}
fn default_repo_provider() -> String {
    "none".to_string()
}
fn default_github_api() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl RepositoryConfig {
    pub fn is_configured(&self) -> bool {
        self.provider != "none"
    }

    /// Coordinate handed to the explorer. The local provider falls back to the
    /// checkout directory name when no explicit name is configured.
    pub fn coordinate(&self) -> RepoCoordinate {
        let name = self
            .name
            .clone()
            .or_else(|| {
                self.root
                    .as_ref()
                    .and_then(|r| r.file_name())
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_default();
        RepoCoordinate {
            owner: self.owner.clone(),
            name,
            branch: self.branch.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_files_per_dir")]
    pub max_files_per_dir: usize,
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
    /// Tried after learned patterns and before the built-in candidates.
    #[serde(default)]
    pub extra_paths: Vec<String>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_interest_terms")]
    pub interest_terms: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_files_per_dir: default_max_files_per_dir(),
            max_file_chars: default_max_file_chars(),
            extra_paths: Vec::new(),
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            interest_terms: default_interest_terms(),
        }
    }
}

fn default_max_depth() -> usize {
    8
}
fn default_max_files_per_dir() -> usize {
    15
}
fn default_max_file_chars() -> usize {
    100_000
}

fn default_include_globs() -> Vec<String> {
    [
        "js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte", "py", "rb", "go", "rs", "java",
        "kt", "php", "cs", "swift", "json", "yaml", "yml", "toml", "md", "sql", "graphql", "prisma",
    ]
    .iter()
    .map(|ext| format!("**/*.{}", ext))
    .collect()
}

fn default_exclude_globs() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "bmp", "woff", "woff2", "ttf", "eot",
        "otf", "map", "mp3", "mp4", "webm", "pdf", "zip", "gz", "tar", "wasm", "lock",
    ]
    .iter()
    .map(|ext| format!("**/*.{}", ext))
    .chain(
        ["**/*.min.js", "**/package-lock.json"]
            .iter()
            .map(|s| s.to_string()),
    )
    .collect()
}

fn default_interest_terms() -> Vec<String> {
    [
        "api",
        "service",
        "controller",
        "model",
        "member",
        "content",
        "subscription",
        "job",
        "route",
        "handler",
        "schema",
        "auth",
        "payment",
        "function",
        "lib",
        "component",
        "hook",
        "store",
        "page",
        "util",
        "core",
        "src",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Entries must score strictly above this to be returned.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Entries supplied as grounding context to the generation call.
    #[serde(default = "default_context_entries")]
    pub context_entries: usize,
    /// Entries concatenated into the deterministic fallback answer.
    #[serde(default = "default_fallback_entries")]
    pub fallback_entries: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            context_entries: default_context_entries(),
            fallback_entries: default_fallback_entries(),
            preview_chars: default_preview_chars(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_min_score() -> f64 {
    0.1
}
fn default_context_entries() -> usize {
    10
}
fn default_fallback_entries() -> usize {
    5
}
fn default_preview_chars() -> usize {
    500
}
fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_openai_api")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_model(),
            api_base: default_openai_api(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_generation_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_api() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.3
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_true")]
    pub seed_fallback: bool,
    #[serde(default)]
    pub enrich_history: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed_fallback: true,
            enrich_history: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Built-in defaults: no repository, generation disabled, fallback seeded.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate repository
    match config.repository.provider.as_str() {
        "none" => {}
        "github" => {
            if config.repository.owner.is_none() || config.repository.name.is_none() {
                anyhow::bail!("repository.owner and repository.name are required for provider 'github'");
            }
        }
        "local" => {
            if config.repository.root.is_none() {
                anyhow::bail!("repository.root is required for provider 'local'");
            }
        }
        other => anyhow::bail!(
            "Unknown repository provider: '{}'. Must be none, github, or local.",
            other
        ),
    }

    // Validate explorer
    if config.explorer.max_depth == 0 {
        anyhow::bail!("explorer.max_depth must be >= 1");
    }
    if config.explorer.max_files_per_dir == 0 {
        anyhow::bail!("explorer.max_files_per_dir must be >= 1");
    }
    if config.explorer.max_file_chars == 0 {
        anyhow::bail!("explorer.max_file_chars must be > 0");
    }

    // Validate retrieval
    if !(0.0..1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [0.0, 1.0)");
    }
    if config.retrieval.context_entries == 0 || config.retrieval.fallback_entries == 0 {
        anyhow::bail!("retrieval.context_entries and retrieval.fallback_entries must be >= 1");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
