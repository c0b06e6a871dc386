// src/resolver.rs

//! Dependency resolution over prioritized repository views
//!
//! This module computes the closure of a requested package set:
//! - Direct match: first repository view (in caller order) with an exact
//!   package wins
//! - Group fallback: a requested name that is only a group pulls in the
//!   group's members, optionally filtered through an interactive prompt
//! - Transitive closure: strict-FIFO expansion of dependency specifiers,
//!   skipping anything the local install database already satisfies
//!
//! Packages are classified "official" when their repository name is in the
//! caller's trusted set, "other" when it is not. Unresolvable requests and
//! unmet dependencies are reported, never fatal.

use crate::package::{DependencySpec, PackageRecord, PackageSet};
use crate::repository::{GroupPrompt, LocalInstallQuery, RepositoryView};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Caller-supplied policy for one resolver invocation
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Requested package or group identities
    pub requested: HashSet<String>,

    /// Identities to exclude from the result
    pub ignored_packages: HashSet<String>,

    /// Group names whose members are excluded from the result
    pub ignored_groups: HashSet<String>,

    /// Repository names whose packages are classified "official"
    pub trusted_repositories: HashSet<String>,

    /// Expand transitive dependencies
    pub resolve_dependencies: bool,

    /// Re-resolve dependencies even when the local install database
    /// already satisfies them
    pub always_refresh_satisfied: bool,

    /// Route group expansion through the prompt collaborator
    ///
    /// Without an attached prompt the flag degrades to the
    /// non-interactive behavior: the full group candidate set is merged.
    pub interactive_groups: bool,
}

impl ResolveOptions {
    /// Options for a requested identity set with dependency resolution on
    pub fn new(requested: impl IntoIterator<Item = String>) -> Self {
        Self {
            requested: requested.into_iter().collect(),
            resolve_dependencies: true,
            ..Self::default()
        }
    }
}

/// Outcome of one resolver invocation
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Packages from trusted repositories
    pub official: PackageSet,

    /// Packages from non-trusted repositories
    pub other: PackageSet,

    /// Requested identities that matched neither a package nor a group
    pub not_found: BTreeSet<String>,

    /// Dependency specifiers no repository view could satisfy
    pub missing_deps: Vec<DependencySpec>,
}

/// Resolves requested identities plus transitive dependencies over an
/// ordered list of repository views
///
/// Search priority is the caller-supplied repository order. The local
/// install query and the repository views are read-only collaborators; all
/// working state is private to one `resolve` call.
pub struct DependencyResolver<'a> {
    repositories: &'a [&'a dyn RepositoryView],
    local: &'a dyn LocalInstallQuery,
    prompt: Option<&'a dyn GroupPrompt>,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over the given views and local install query
    pub fn new(
        repositories: &'a [&'a dyn RepositoryView],
        local: &'a dyn LocalInstallQuery,
    ) -> Self {
        Self {
            repositories,
            local,
            prompt: None,
        }
    }

    /// Attach an interactive group-selection prompt
    pub fn with_prompt(mut self, prompt: &'a dyn GroupPrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Resolve the requested identities into classified package sets
    pub fn resolve(&self, options: &ResolveOptions) -> ResolutionResult {
        let mut official = PackageSet::new();
        let mut other = PackageSet::new();
        let mut missing_deps = Vec::new();
        let mut group_matched: HashSet<String> = HashSet::new();

        // Deterministic request order keeps diagnostics stable.
        let mut requested: Vec<&String> = options.requested.iter().collect();
        requested.sort();

        for name in requested {
            if self.resolve_direct(name, options, &mut official, &mut other) {
                continue;
            }
            if self.resolve_group(name, options, &mut official, &mut other) {
                group_matched.insert(name.clone());
            }
        }

        // Ignore packages before expanding dependencies.
        official.ignore(&options.ignored_packages, &options.ignored_groups);
        other.ignore(&options.ignored_packages, &options.ignored_groups);

        if options.resolve_dependencies && !(official.is_empty() && other.is_empty()) {
            self.resolve_closure(options, &mut official, &mut other, &mut missing_deps);

            // Ignore packages pulled in as dependencies. Dependents of a
            // removed package stay resolved; there is no cascading
            // un-resolution.
            official.ignore(&options.ignored_packages, &options.ignored_groups);
            other.ignore(&options.ignored_packages, &options.ignored_groups);
        }

        let not_found: BTreeSet<String> = options
            .requested
            .iter()
            .filter(|name| {
                !official.contains(name.as_str())
                    && !other.contains(name.as_str())
                    && !group_matched.contains(name.as_str())
            })
            .cloned()
            .collect();

        if !not_found.is_empty() {
            let names: Vec<&str> = not_found.iter().map(String::as_str).collect();
            warn!("Can't find these packages: {}", names.join(" "));
        }
        if !missing_deps.is_empty() {
            let mut specs: Vec<String> = missing_deps.iter().map(|d| d.to_string()).collect();
            specs.sort();
            warn!("Can't resolve these dependencies: {}", specs.join(" "));
        }

        info!(
            "Resolved {} official and {} other packages ({} not found, {} unmet dependencies)",
            official.len(),
            other.len(),
            not_found.len(),
            missing_deps.len()
        );

        ResolutionResult {
            official,
            other,
            not_found,
            missing_deps,
        }
    }

    /// Exact lookup across views in order; returns true on a match
    fn resolve_direct(
        &self,
        name: &str,
        options: &ResolveOptions,
        official: &mut PackageSet,
        other: &mut PackageSet,
    ) -> bool {
        for repo in self.repositories {
            if let Some(pkg) = repo.package(name) {
                debug!("Found {} in repository {}", name, repo.name());
                if options.trusted_repositories.contains(repo.name()) {
                    official.add(pkg);
                } else {
                    other.add(pkg);
                }
                return true;
            }
        }
        false
    }

    /// Group lookup across all views, accumulating members; returns true
    /// when at least one view knows the group
    fn resolve_group(
        &self,
        name: &str,
        options: &ResolveOptions,
        official: &mut PackageSet,
        other: &mut PackageSet,
    ) -> bool {
        let mut official_grp = PackageSet::new();
        let mut other_grp = PackageSet::new();
        let mut matched = false;

        for repo in self.repositories {
            if let Some(members) = repo.group(name) {
                matched = true;
                let trusted = options.trusted_repositories.contains(repo.name());
                for member in members {
                    if let Some(pkg) = repo.package(&member) {
                        if trusted {
                            official_grp.add(pkg);
                        } else {
                            other_grp.add(pkg);
                        }
                    }
                }
            }
        }

        if !matched {
            return false;
        }
        debug!(
            "Request {} matched a group with {} candidate members",
            name,
            official_grp.len() + other_grp.len()
        );

        if options.interactive_groups {
            if let Some(prompt) = self.prompt {
                let mut candidates = official_grp.union(&other_grp);
                candidates.ignore(&options.ignored_packages, &HashSet::new());
                let selected = prompt.select(name, &candidates);
                official_grp.retain_names(&selected);
                other_grp.retain_names(&selected);
            }
        }

        official.merge(&official_grp);
        other.merge(&other_grp);
        matched
    }

    /// Strict-FIFO expansion of dependency specifiers
    fn resolve_closure(
        &self,
        options: &ResolveOptions,
        official: &mut PackageSet,
        other: &mut PackageSet,
        missing_deps: &mut Vec<DependencySpec>,
    ) {
        let mut seeds: Vec<PackageRecord> = official.union(other).iter().cloned().collect();
        seeds.sort_by(|a, b| a.name.cmp(&b.name));

        let mut seen: HashSet<String> = seeds.iter().map(|pkg| pkg.name.clone()).collect();
        let mut queue: VecDeque<PackageRecord> = seeds.into();

        while let Some(pkg) = queue.pop_front() {
            for dep in &pkg.depends {
                if !options.always_refresh_satisfied && self.local.satisfies(dep) {
                    debug!("Dependency {} already satisfied locally", dep);
                    continue;
                }

                let mut satisfied = false;
                for repo in self.repositories {
                    if let Some(provider) = repo.find_satisfier(dep) {
                        let is_new = seen.insert(provider.name.clone());
                        if options.trusted_repositories.contains(repo.name()) {
                            official.add(provider.clone());
                        } else {
                            other.add(provider.clone());
                        }
                        if is_new {
                            queue.push_back(provider);
                        }
                        satisfied = true;
                        break;
                    }
                }
                if !satisfied {
                    missing_deps.push(dep.clone());
                }
            }
        }
    }
}
