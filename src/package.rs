// src/package.rs

//! Package records and name-keyed package sets
//!
//! This module provides:
//! - `PackageRecord`: immutable package metadata as supplied by a repository view
//! - `DependencySpec`: a `{name, version-constraint}` dependency specifier
//! - `PackageSet`: a name-keyed collection with named set algebra

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A dependency specifier: a package name plus an optional version constraint
///
/// Constraint satisfaction (range comparison, "provides" aliasing) is never
/// interpreted here; it is delegated to the repository satisfier capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Dependency package name
    pub name: String,

    /// Version constraint (e.g., ">=1.0.0", "=2.3.4-1")
    pub constraint: Option<String>,
}

impl DependencySpec {
    /// Create a specifier with no version constraint
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    /// Create a specifier with a version constraint
    pub fn versioned(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint.into()),
        }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{}{}", self.name, constraint),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Package metadata as obtained from a repository view
///
/// Records are read-only to this crate: once handed out by a view they are
/// only copied between sets, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name, unique within a repository
    pub name: String,

    /// Package version string (format varies by distribution)
    pub version: String,

    /// Compressed package size in bytes
    pub size: u64,

    /// Short human-readable description
    pub description: String,

    /// Package file name within the repository
    pub filename: String,

    /// Architecture (x86_64, aarch64, any, etc.)
    pub architecture: String,

    /// SHA-256 checksum of the package file (hex)
    pub sha256: String,

    /// MD5 checksum of the package file (hex, legacy)
    pub md5: String,

    /// Name of the owning repository
    pub repository: String,

    /// Group memberships
    pub groups: Vec<String>,

    /// Dependency specifiers, in declaration order
    pub depends: Vec<DependencySpec>,
}

/// A set of packages keyed by name
///
/// Never holds two records with the same name; the last write for a name
/// wins. Iteration order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    pkgs: HashMap<String, PackageRecord>,
}

impl PackageSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing record with the same name
    pub fn add(&mut self, pkg: PackageRecord) {
        self.pkgs.insert(pkg.name.clone(), pkg);
    }

    /// Remove every record whose name is in `names` or whose group
    /// memberships intersect `groups`
    pub fn ignore(&mut self, names: &HashSet<String>, groups: &HashSet<String>) {
        self.pkgs
            .retain(|name, pkg| !names.contains(name) && !pkg.groups.iter().any(|g| groups.contains(g)));
    }

    /// Union of two sets; on a name collision the right-hand record wins
    pub fn union(&self, other: &PackageSet) -> PackageSet {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// In-place union; on a name collision `other`'s record wins
    pub fn merge(&mut self, other: &PackageSet) {
        for pkg in other.iter() {
            self.add(pkg.clone());
        }
    }

    /// Intersection of two sets by name, keeping this set's records
    pub fn intersect(&self, other: &PackageSet) -> PackageSet {
        let mut out = self.clone();
        out.intersect_in_place(other);
        out
    }

    /// In-place intersection by name
    pub fn intersect_in_place(&mut self, other: &PackageSet) {
        self.pkgs.retain(|name, _| other.contains(name));
    }

    /// Keep only records whose name is in `names`
    pub fn retain_names(&mut self, names: &HashSet<String>) {
        self.pkgs.retain(|name, _| names.contains(name));
    }

    /// Whether a record with this name is present
    pub fn contains(&self, name: &str) -> bool {
        self.pkgs.contains_key(name)
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.pkgs.get(name)
    }

    /// Number of records in the set
    pub fn len(&self) -> usize {
        self.pkgs.len()
    }

    /// Whether the set holds no records
    pub fn is_empty(&self) -> bool {
        self.pkgs.is_empty()
    }

    /// Iterate over records (unspecified order)
    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.pkgs.values()
    }

    /// Iterate over record names (unspecified order)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pkgs.keys().map(String::as_str)
    }
}

impl FromIterator<PackageRecord> for PackageSet {
    fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
        let mut set = PackageSet::new();
        for pkg in iter {
            set.add(pkg);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a PackageRecord;
    type IntoIter = std::collections::hash_map::Values<'a, String, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.pkgs.values()
    }
}
