use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::RepositoryConfig;
use crate::error::FetchError;
use crate::fetcher::{join_path, ContentFetcher};
use crate::models::{DirEntry, EntryKind, FilePayload};

/// Fetcher over a repository checkout on the local filesystem.
///
/// Lists one directory level at a time, mirroring what the remote API
/// offers, so exploration behaves identically against both.
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let root = config
            .root
            .clone()
            .ok_or_else(|| anyhow::anyhow!("repository.root required for local provider"))?;
        Self::from_root(root)
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("Local repository root does not exist: {}", root.display());
        }
        Ok(Self { root })
    }

    /// Resolve a repository-relative path, rejecting anything that would
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let rel = Path::new(path.trim_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::NotFound(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ContentFetcher for LocalFetcher {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FetchError> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() {
            return Err(FetchError::NotFound(path.to_string()));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| FetchError::Io(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == ".git" {
                continue;
            }
            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else if entry.file_type().is_file() {
                EntryKind::File
            } else {
                continue;
            };
            entries.push(DirEntry {
                path: join_path(path, &name),
                name,
                kind,
            });
        }
        Ok(entries)
    }

    async fn get_file_content(&self, path: &str) -> Result<FilePayload, FetchError> {
        let file = self.resolve(path)?;
        if !file.is_file() {
            return Err(FetchError::NotFound(path.to_string()));
        }
        let content = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| FetchError::Io(format!("{}: {}", path, e)))?;
        Ok(FilePayload::utf8(content))
    }
}
