//! GitHub contents API fetcher.
//!
//! Lists directories and downloads files through the
//! [repository contents](https://docs.github.com/en/rest/repos/contents)
//! REST endpoint. File bodies arrive base64-encoded and are handed to the
//! file processor undecoded.
//!
//! # Configuration
//!
//! ```toml
//! [repository]
//! provider = "github"
//! owner = "acme"
//! name = "platform"
//! branch = "main"          # optional, defaults to the repository default branch
//! token_env = "GITHUB_TOKEN"
//! # api_base = "https://github.example.com/api/v3"   # GitHub Enterprise
//! ```
//!
//! # Authentication
//!
//! The token is read from the environment variable named by `token_env`.
//! Without a token requests are anonymous and subject to the low
//! unauthenticated rate limit.
//!
//! # Status mapping
//!
//! | HTTP | [`FetchError`] |
//! |------|----------------|
//! | 404 | `NotFound` |
//! | 429, or 403 with `x-ratelimit-remaining: 0` | `RateLimited` |
//! | 401, 403 | `AccessDenied` |
//! | other non-2xx | `Http` |
//!
//! Rate-limited, 5xx and network failures are retried up to
//! `repository.max_retries` times with exponential backoff.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::RepositoryConfig;
use crate::error::FetchError;
use crate::fetcher::ContentFetcher;
use crate::models::{DirEntry, EntryKind, FilePayload};

const USER_AGENT: &str = concat!("repo-lens/", env!("CARGO_PKG_VERSION"));

/// Fetcher backed by the GitHub REST API.
pub struct GitHubFetcher {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    name: String,
    branch: Option<String>,
    token: Option<String>,
    max_retries: u32,
}

impl GitHubFetcher {
    /// Create a fetcher from the `[repository]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if `owner` or `name` is missing or the HTTP client
    /// cannot be built.
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let owner = config
            .owner
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository.owner required for GitHub provider"))?;
        let name = config
            .name
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository.name required for GitHub provider"))?;

        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::info!(
                "{} not set; using unauthenticated GitHub requests",
                config.token_env
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner,
            name,
            branch: config.branch.clone(),
            token,
            max_retries: config.max_retries,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        let mut url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, self.owner, self.name, encoded
        );
        if let Some(ref branch) = self.branch {
            url.push_str("?ref=");
            url.push_str(&uri_encode(branch));
        }
        url
    }

    /// One request, retried with exponential backoff (1s, 2s, 4s, ...) while
    /// the failure is retryable and attempts remain.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        let mut attempt = 0;
        loop {
            match self.request_json(path).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                    tracing::debug!(
                        path,
                        attempt,
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "retrying GitHub request"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn request_json(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        let mut req = self
            .client
            .get(self.contents_url(path))
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{}: {}", path, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let rate_exhausted = resp
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim() == "0")
                .unwrap_or(false);
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), rate_exhausted, path, &body));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ContentFetcher for GitHubFetcher {
    fn name(&self) -> &str {
        "github"
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let value = self.get_json(path).await?;
        parse_listing(path, value)
    }

    async fn get_file_content(&self, path: &str) -> Result<FilePayload, FetchError> {
        let value = self.get_json(path).await?;
        parse_file(path, value)
    }
}

#[derive(Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    item_type: String,
}

#[derive(Deserialize)]
struct FileItem {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Map a non-success status to a [`FetchError`].
fn map_status(status: u16, rate_exhausted: bool, path: &str, body: &str) -> FetchError {
    match status {
        404 => FetchError::NotFound(path.to_string()),
        429 => FetchError::RateLimited(path.to_string()),
        403 if rate_exhausted => FetchError::RateLimited(path.to_string()),
        401 | 403 => FetchError::AccessDenied(path.to_string()),
        _ => FetchError::Http {
            status,
            path: path.to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}

/// Parse a contents listing. Symlinks and submodules are skipped.
fn parse_listing(path: &str, value: serde_json::Value) -> Result<Vec<DirEntry>, FetchError> {
    if !value.is_array() {
        return Err(FetchError::Decode {
            path: path.to_string(),
            message: "expected a directory listing".to_string(),
        });
    }
    let items: Vec<ContentItem> =
        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let kind = match item.item_type.as_str() {
                "file" => EntryKind::File,
                "dir" => EntryKind::Dir,
                _ => return None,
            };
            Some(DirEntry {
                name: item.name,
                path: item.path,
                kind,
            })
        })
        .collect())
}

fn parse_file(path: &str, value: serde_json::Value) -> Result<FilePayload, FetchError> {
    if value.is_array() {
        return Err(FetchError::Decode {
            path: path.to_string(),
            message: "expected a file, got a directory".to_string(),
        });
    }
    let item: FileItem = serde_json::from_value(value).map_err(|e| FetchError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let content = item.content.unwrap_or_default();
    match item.encoding.as_deref() {
        Some("base64") => Ok(FilePayload::base64(content)),
        Some("utf-8") | Some("utf8") => Ok(FilePayload::utf8(content)),
        other => Err(FetchError::Decode {
            path: path.to_string(),
            message: format!("unsupported content encoding: {:?}", other),
        }),
    }
}

/// URI-encode a path segment per RFC 3986.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
