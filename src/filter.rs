use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ExplorerConfig;

/// Decides which listed entries are worth a request.
///
/// Files must match an include glob and no exclude glob. Directories are
/// followed only when their name contains an interest term.
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
    interest_terms: Vec<String>,
}

impl PathFilter {
    pub fn new(config: &ExplorerConfig) -> Result<Self> {
        let mut excludes = vec![
            "**/node_modules/**".to_string(),
            "**/.git/**".to_string(),
            "**/dist/**".to_string(),
            "**/target/**".to_string(),
        ];
        excludes.extend(config.exclude_globs.iter().cloned());

        Ok(Self {
            include: build_globset(&config.include_globs).context("invalid explorer.include_globs")?,
            exclude: build_globset(&excludes).context("invalid explorer.exclude_globs")?,
            interest_terms: config
                .interest_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        })
    }

    /// Binary/asset exclusion, checked before any fetch.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.is_match(path)
    }

    /// A recognized source file that is not excluded.
    pub fn is_source(&self, path: &str) -> bool {
        !self.is_excluded(path) && self.include.is_match(path)
    }

    /// Substring match of a directory name against the interest vocabulary.
    pub fn is_interesting(&self, dir_name: &str) -> bool {
        let name = dir_name.to_lowercase();
        if matches!(name.as_str(), "node_modules" | "dist" | "target" | ".git") {
            return false;
        }
        self.interest_terms.iter().any(|t| name.contains(t.as_str()))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PathFilter {
        PathFilter::new(&ExplorerConfig::default()).unwrap()
    }

    #[test]
    fn source_files_pass() {
        let f = filter();
        assert!(f.is_source("index.ts"));
        assert!(f.is_source("src/api/users.controller.ts"));
        assert!(f.is_source("package.json"));
        assert!(!f.is_source("Dockerfile"));
    }

    #[test]
    fn assets_are_excluded() {
        let f = filter();
        assert!(f.is_excluded("public/logo.png"));
        assert!(f.is_excluded("dist/app.js.map"));
        assert!(f.is_excluded("vendor/jquery.min.js"));
        assert!(!f.is_source("vendor/jquery.min.js"));
        assert!(!f.is_source("node_modules/left-pad/index.js"));
    }

    #[test]
    fn interest_is_substring_match() {
        let f = filter();
        assert!(f.is_interesting("services"));
        assert!(f.is_interesting("MemberPortal"));
        assert!(f.is_interesting("subscription-jobs"));
        assert!(!f.is_interesting("assets"));
        assert!(!f.is_interesting("node_modules"));
    }

    #[test]
    fn bad_glob_is_an_error() {
        let config = ExplorerConfig {
            include_globs: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(PathFilter::new(&config).is_err());
    }
}
