//! Content fetcher abstraction.
//!
//! A [`ContentFetcher`] is the only component that talks to the repository:
//! it lists directories and returns raw file payloads. Latency, timeouts and
//! authentication belong to the implementation; the exploration pipeline only
//! distinguishes success from failure.
//!
//! # Implementations
//!
//! | Type | Provider | Source |
//! |------|----------|--------|
//! | [`GitHubFetcher`](crate::connector_github::GitHubFetcher) | `github` | GitHub contents REST API |
//! | [`LocalFetcher`](crate::connector_fs::LocalFetcher) | `local` | A checkout on disk |

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::RepositoryConfig;
use crate::connector_fs::LocalFetcher;
use crate::connector_github::GitHubFetcher;
use crate::error::FetchError;
use crate::models::{DirEntry, FilePayload};

/// Read access to a repository tree.
///
/// Paths are repository-relative with `/` separators; the empty string is
/// the repository root.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Short identifier used in logs (e.g. `"github"`).
    fn name(&self) -> &str;

    /// List the immediate children of a directory.
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FetchError>;

    /// Fetch one file's raw payload. Decoding is left to the caller.
    async fn get_file_content(&self, path: &str) -> Result<FilePayload, FetchError>;
}

/// Instantiate the fetcher selected by `repository.provider`.
///
/// Returns `Ok(None)` when no repository is configured.
pub fn create_fetcher(config: &RepositoryConfig) -> Result<Option<Box<dyn ContentFetcher>>> {
    match config.provider.as_str() {
        "none" => Ok(None),
        "github" => Ok(Some(Box::new(GitHubFetcher::new(config)?))),
        "local" => Ok(Some(Box::new(LocalFetcher::new(config)?))),
        other => bail!("Unknown repository provider: {}", other),
    }
}

/// Join a directory path and a child name into a repository-relative path.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_root_and_nested() {
        assert_eq!(join_path("", "src"), "src");
        assert_eq!(join_path("src/", "api"), "src/api");
        assert_eq!(join_path("/src/api", "users.ts"), "src/api/users.ts");
    }

    #[test]
    fn none_provider_has_no_fetcher() {
        let config = RepositoryConfig::default();
        assert!(create_fetcher(&config).unwrap().is_none());
    }
}
