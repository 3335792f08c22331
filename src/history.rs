//! Version-control history lookup for reference metadata.
//!
//! Entries carry an extraction timestamp by default. When
//! `session.enrich_history` is on, a [`HistoryProvider`] supplies the real
//! last-change author and date per file.
//!
//! | Provider | Source |
//! |----------|--------|
//! | [`GitLogHistory`] | `git log -1` in a local checkout |
//! | [`GitHubHistory`] | GitHub commits API filtered by path |

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::RepositoryConfig;

/// Author and date of the most recent change to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHistory {
    pub author: String,
    pub date: DateTime<Utc>,
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// `Ok(None)` when the file has no recorded history.
    async fn last_change(&self, path: &str) -> Result<Option<FileHistory>>;
}

/// History from the `git` binary in a local checkout.
pub struct GitLogHistory {
    root: PathBuf,
}

impl GitLogHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl HistoryProvider for GitLogHistory {
    async fn last_change(&self, path: &str) -> Result<Option<FileHistory>> {
        let output = tokio::process::Command::new("git")
            .args(["log", "-1", "--format=%an%x1f%cI", "--", path])
            .current_dir(&self.root)
            .output()
            .await
            .context("Failed to run git log")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git log failed for {}: {}", path, stderr.trim());
        }
        parse_git_log(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `%an\x1f%cI` output. Empty output means no history.
fn parse_git_log(stdout: &str) -> Result<Option<FileHistory>> {
    let line = stdout.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (author, date) = line
        .split_once('\u{1f}')
        .ok_or_else(|| anyhow::anyhow!("unexpected git log output: {}", line))?;
    let date = DateTime::parse_from_rfc3339(date.trim())
        .with_context(|| format!("invalid commit date: {}", date))?
        .with_timezone(&Utc);
    Ok(Some(FileHistory {
        author: author.trim().to_string(),
        date,
    }))
}

/// History from the GitHub commits API.
pub struct GitHubHistory {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    name: String,
    branch: Option<String>,
    token: Option<String>,
}

impl GitHubHistory {
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let owner = config
            .owner
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository.owner required for GitHub history"))?;
        let name = config
            .name
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository.name required for GitHub history"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("repo-lens/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner,
            name,
            branch: config.branch.clone(),
            token: std::env::var(&config.token_env)
                .ok()
                .filter(|t| !t.trim().is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    author: CommitAuthor,
}

#[derive(Deserialize)]
struct CommitAuthor {
    name: String,
    date: DateTime<Utc>,
}

#[async_trait]
impl HistoryProvider for GitHubHistory {
    async fn last_change(&self, path: &str) -> Result<Option<FileHistory>> {
        let url = format!("{}/repos/{}/{}/commits", self.api_base, self.owner, self.name);
        let mut query = vec![("path", path.to_string()), ("per_page", "1".to_string())];
        if let Some(ref branch) = self.branch {
            query.push(("sha", branch.clone()));
        }

        let mut req = self
            .client
            .get(&url)
            .query(&query)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.context("GitHub commits request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("GitHub commits API error {}: {}", status, body);
        }

        let commits: Vec<CommitItem> = resp
            .json()
            .await
            .context("Invalid GitHub commits response")?;
        Ok(commits.into_iter().next().map(|c| FileHistory {
            author: c.commit.author.name,
            date: c.commit.author.date,
        }))
    }
}

/// The history provider matching `repository.provider`, if any.
pub fn create_history(config: &RepositoryConfig) -> Result<Option<Box<dyn HistoryProvider>>> {
    match config.provider.as_str() {
        "github" => Ok(Some(Box::new(GitHubHistory::new(config)?))),
        "local" => {
            let root = config
                .root
                .clone()
                .ok_or_else(|| anyhow::anyhow!("repository.root required for local history"))?;
            Ok(Some(Box::new(GitLogHistory::new(root))))
        }
        _ => Ok(None),
    }
}
