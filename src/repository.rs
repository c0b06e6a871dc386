// src/repository.rs

//! External collaborator contracts
//!
//! This crate never talks to a package database or the network directly.
//! Everything it needs from the outside world arrives through the traits in
//! this module:
//! - `RepositoryView`: a read-only view of one sync repository snapshot
//! - `LocalInstallQuery`: whether a dependency is already satisfied locally
//! - `MirrorRanker`: an optional source of ranked mirror base URLs
//! - `GroupPrompt`: interactive selection of group members

use crate::package::{DependencySpec, PackageRecord};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Read-only view of one sync repository snapshot
///
/// Implementations own the package cache and the group table; all lookup
/// and satisfier semantics (name equality, version-range comparison,
/// "provides" aliasing) live behind this trait and are never reimplemented
/// by the resolver.
pub trait RepositoryView {
    /// Repository name (e.g., "core", "community")
    fn name(&self) -> &str;

    /// Configured mirror server base URLs, in configuration order
    fn servers(&self) -> &[String];

    /// Per-repository signature-level string, if configured
    ///
    /// Recognized values are "Required", "Optional", and the
    /// resource-prefixed forms such as "PackageOptional" or
    /// "DatabaseRequired".
    fn signature_level(&self) -> Option<&str>;

    /// Exact package lookup by name
    fn package(&self, name: &str) -> Option<PackageRecord>;

    /// Group lookup by name, returning member package identities
    fn group(&self, name: &str) -> Option<Vec<String>>;

    /// Search the package cache for a package satisfying the specifier
    fn find_satisfier(&self, dep: &DependencySpec) -> Option<PackageRecord>;

    /// Enumerate the full package cache
    fn packages(&self) -> Vec<PackageRecord>;
}

/// Queries the local install database
pub trait LocalInstallQuery {
    /// Whether the dependency specifier is already satisfied on the system
    fn satisfies(&self, dep: &DependencySpec) -> bool;
}

/// A candidate mirror returned by the mirror-ranking collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    /// Mirror base URL
    pub url: String,
}

/// Optional mirror-ranking collaborator
///
/// Invoked at most once per download-queue build. Errors and absence both
/// degrade to "no extra mirrors", never to a build failure.
pub trait MirrorRanker {
    /// Ranked candidate mirrors, best first
    fn ranked_mirrors(&self) -> Result<Vec<Mirror>>;
}

/// The no-op ranker used when mirror ranking is not configured
#[derive(Debug, Default)]
pub struct NoMirrorRanker;

impl MirrorRanker for NoMirrorRanker {
    fn ranked_mirrors(&self) -> Result<Vec<Mirror>> {
        Ok(Vec::new())
    }
}

/// Interactive group-member selection collaborator
pub trait GroupPrompt {
    /// Given a group name and its candidate members, return the accepted
    /// package identities (a subset of the candidates)
    fn select(&self, group: &str, candidates: &crate::package::PackageSet) -> HashSet<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_mirror_ranker_returns_empty() {
        let ranker = NoMirrorRanker;
        let mirrors = ranker.ranked_mirrors().unwrap();
        assert!(mirrors.is_empty());
    }
}
