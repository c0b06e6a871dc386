// src/queue.rs

//! Download queue assembly
//!
//! Turns resolved package sets into an ordered download queue:
//! - optional database entries, one per configured repository view
//! - official packages with configured mirrors first, then ranked mirrors
//!   (deduplicated, caller order never disturbed)
//! - other packages with configured mirrors only
//!
//! Every entry carries a signature decision derived from the repository's
//! signature-level policy and the caller's insistence level.

use crate::package::{PackageRecord, PackageSet};
use crate::repository::{MirrorRanker, RepositoryView};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Kind of resource a signature decision applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Database,
    Package,
}

impl ResourceKind {
    fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Database => "Database",
            ResourceKind::Package => "Package",
        }
    }
}

/// Decide whether a detached signature should be downloaded
///
/// `signature_level` is the repository's configured policy string. An
/// insistence below 1 never fetches signatures and above 1 always does;
/// at exactly 1 the signature level is consulted: "Required", "Optional",
/// or the resource-kind-prefixed forms enable the fetch.
pub fn needs_signature(
    signature_level: Option<&str>,
    insistence: i32,
    kind: ResourceKind,
) -> bool {
    if insistence > 1 {
        return true;
    }
    if insistence < 1 {
        return false;
    }
    let Some(level) = signature_level else {
        return false;
    };
    for suffix in ["Required", "Optional"] {
        if level == suffix || level == format!("{}{}", kind.as_str(), suffix) {
            return true;
        }
    }
    false
}

/// A queued repository database download
#[derive(Debug, Clone)]
pub struct DatabaseRequest {
    /// Repository name; the file downloaded is `<name>.db`
    pub name: String,

    /// Mirror server base URLs, in configuration order
    pub servers: Vec<String>,

    /// Whether the detached `.sig` should also be fetched
    pub want_signature: bool,
}

/// A queued package download
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// The resolved package record
    pub package: PackageRecord,

    /// Candidate download URLs, best first
    pub urls: Vec<String>,

    /// Whether the detached `.sig` should also be fetched
    pub want_signature: bool,
}

/// Ordered download queue: databases first, then packages
#[derive(Debug, Clone, Default)]
pub struct DownloadQueue {
    pub databases: Vec<DatabaseRequest>,
    pub packages: Vec<PackageRequest>,
}

impl DownloadQueue {
    pub fn add_database(&mut self, db: DatabaseRequest) {
        self.databases.push(db);
    }

    pub fn add_package(&mut self, pkg: PackageRequest) {
        self.packages.push(pkg);
    }

    /// Whether there is nothing to download
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.packages.is_empty()
    }
}

/// Caller-supplied policy for one queue build
#[derive(Debug, Clone, Default)]
pub struct QueueOptions {
    /// Enqueue every configured repository database
    pub fetch_databases: bool,

    /// Consult the mirror-ranking collaborator for official packages
    pub rank_mirrors: bool,

    /// Signature insistence level (see `needs_signature`)
    pub signature_insistence: i32,
}

/// Assembles a `DownloadQueue` from classified package sets
pub struct DownloadQueueBuilder<'a> {
    repositories: &'a [&'a dyn RepositoryView],
    ranker: &'a dyn MirrorRanker,
}

impl<'a> DownloadQueueBuilder<'a> {
    /// Create a builder over the configured views and mirror ranker
    ///
    /// Pass `NoMirrorRanker` when ranking is not configured.
    pub fn new(repositories: &'a [&'a dyn RepositoryView], ranker: &'a dyn MirrorRanker) -> Self {
        Self {
            repositories,
            ranker,
        }
    }

    /// Build the download queue for the given official/other package sets
    pub fn build(
        &self,
        official: &PackageSet,
        other: &PackageSet,
        options: &QueueOptions,
    ) -> DownloadQueue {
        let mut queue = DownloadQueue::default();

        if options.fetch_databases {
            for repo in self.repositories {
                let want_signature = needs_signature(
                    repo.signature_level(),
                    options.signature_insistence,
                    ResourceKind::Database,
                );
                queue.add_database(DatabaseRequest {
                    name: repo.name().to_string(),
                    servers: repo.servers().to_vec(),
                    want_signature,
                });
            }
        }

        // The ranker runs at most once per build, never per package.
        let ranked = if options.rank_mirrors && !official.is_empty() {
            match self.ranker.ranked_mirrors() {
                Ok(mirrors) => mirrors,
                Err(e) => {
                    warn!("Mirror ranking unavailable, using configured mirrors only: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        for pkg in sorted_by_name(official) {
            let mut urls = self.configured_urls(&pkg);
            // Configured mirrors keep their order; ranked mirrors follow,
            // minus duplicates.
            let mut seen: HashSet<String> = urls.iter().cloned().collect();
            for mirror in &ranked {
                let url = join_url(&mirror.url, &pkg.filename);
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            self.enqueue_package(&mut queue, pkg, urls, options);
        }

        for pkg in sorted_by_name(other) {
            let urls = self.configured_urls(&pkg);
            self.enqueue_package(&mut queue, pkg, urls, options);
        }

        info!(
            "Queued {} database and {} package downloads",
            queue.databases.len(),
            queue.packages.len()
        );
        queue
    }

    fn enqueue_package(
        &self,
        queue: &mut DownloadQueue,
        pkg: PackageRecord,
        urls: Vec<String>,
        options: &QueueOptions,
    ) {
        let level = self
            .view(&pkg.repository)
            .and_then(|repo| repo.signature_level().map(str::to_string));
        let want_signature = needs_signature(
            level.as_deref(),
            options.signature_insistence,
            ResourceKind::Package,
        );
        debug!(
            "Queueing {} with {} candidate URLs (signature: {})",
            pkg.filename,
            urls.len(),
            want_signature
        );
        queue.add_package(PackageRequest {
            package: pkg,
            urls,
            want_signature,
        });
    }

    /// URLs built from the owning repository's configured servers
    fn configured_urls(&self, pkg: &PackageRecord) -> Vec<String> {
        match self.view(&pkg.repository) {
            Some(repo) => repo
                .servers()
                .iter()
                .map(|server| join_url(server, &pkg.filename))
                .collect(),
            None => {
                warn!(
                    "No configured view for repository {} of package {}",
                    pkg.repository, pkg.name
                );
                Vec::new()
            }
        }
    }

    fn view(&self, name: &str) -> Option<&dyn RepositoryView> {
        self.repositories
            .iter()
            .find(|repo| repo.name() == name)
            .copied()
    }
}

/// Join a mirror base URL with a file name
pub(crate) fn join_url(base: &str, filename: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), filename)
}

/// Deterministic queue order: packages sorted by name
fn sorted_by_name(set: &PackageSet) -> Vec<PackageRecord> {
    let mut pkgs: Vec<PackageRecord> = set.iter().cloned().collect();
    pkgs.sort_by(|a, b| a.name.cmp(&b.name));
    pkgs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::DependencySpec;
    use crate::repository::{Mirror, NoMirrorRanker};
    use crate::{Error, Result};

    struct TestRepo {
        name: String,
        servers: Vec<String>,
        signature_level: Option<String>,
    }

    impl TestRepo {
        fn new(name: &str, servers: &[&str], signature_level: Option<&str>) -> Self {
            Self {
                name: name.to_string(),
                servers: servers.iter().map(|s| s.to_string()).collect(),
                signature_level: signature_level.map(str::to_string),
            }
        }
    }

    impl RepositoryView for TestRepo {
        fn name(&self) -> &str {
            &self.name
        }

        fn servers(&self) -> &[String] {
            &self.servers
        }

        fn signature_level(&self) -> Option<&str> {
            self.signature_level.as_deref()
        }

        fn package(&self, _name: &str) -> Option<PackageRecord> {
            None
        }

        fn group(&self, _name: &str) -> Option<Vec<String>> {
            None
        }

        fn find_satisfier(&self, _dep: &DependencySpec) -> Option<PackageRecord> {
            None
        }

        fn packages(&self) -> Vec<PackageRecord> {
            Vec::new()
        }
    }

    struct FixedRanker(Vec<Mirror>);

    impl MirrorRanker for FixedRanker {
        fn ranked_mirrors(&self) -> Result<Vec<Mirror>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRanker;

    impl MirrorRanker for FailingRanker {
        fn ranked_mirrors(&self) -> Result<Vec<Mirror>> {
            Err(Error::InitError("ranking service unreachable".to_string()))
        }
    }

    fn record(name: &str, repository: &str) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            version: "1.0.0-1".to_string(),
            size: 2048,
            description: format!("test package {}", name),
            filename: format!("{}-1.0.0-1-x86_64.pkg.tar.zst", name),
            architecture: "x86_64".to_string(),
            sha256: "aa".repeat(32),
            md5: "bb".repeat(16),
            repository: repository.to_string(),
            groups: Vec::new(),
            depends: Vec::new(),
        }
    }

    fn set_of(pkgs: &[PackageRecord]) -> PackageSet {
        pkgs.iter().cloned().collect()
    }

    #[test]
    fn test_needs_signature_insistence_bounds() {
        for level in [None, Some("Required"), Some("Never")] {
            assert!(!needs_signature(level, 0, ResourceKind::Package));
            assert!(!needs_signature(level, -1, ResourceKind::Database));
            assert!(needs_signature(level, 2, ResourceKind::Package));
            assert!(needs_signature(level, 2, ResourceKind::Database));
        }
    }

    #[test]
    fn test_needs_signature_level_checks() {
        assert!(needs_signature(Some("Required"), 1, ResourceKind::Package));
        assert!(needs_signature(Some("Optional"), 1, ResourceKind::Database));
        assert!(!needs_signature(None, 1, ResourceKind::Package));
        assert!(needs_signature(
            Some("PackageOptional"),
            1,
            ResourceKind::Package
        ));
        assert!(!needs_signature(
            Some("PackageOptional"),
            1,
            ResourceKind::Database
        ));
        assert!(needs_signature(
            Some("DatabaseRequired"),
            1,
            ResourceKind::Database
        ));
        assert!(!needs_signature(Some("Never"), 1, ResourceKind::Package));
    }

    #[test]
    fn test_fetch_databases_enqueues_every_view() {
        let core = TestRepo::new(
            "core",
            &["https://a.example.com/core"],
            Some("DatabaseRequired"),
        );
        let extra = TestRepo::new("extra", &["https://a.example.com/extra"], None);
        let repos: Vec<&dyn RepositoryView> = vec![&core, &extra];

        let options = QueueOptions {
            fetch_databases: true,
            rank_mirrors: false,
            signature_insistence: 1,
        };
        let queue = DownloadQueueBuilder::new(&repos, &NoMirrorRanker)
            .build(&PackageSet::new(), &PackageSet::new(), &options);

        assert_eq!(queue.databases.len(), 2);
        assert_eq!(queue.databases[0].name, "core");
        assert!(queue.databases[0].want_signature);
        assert!(!queue.databases[1].want_signature);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_official_urls_configured_then_ranked_deduplicated() {
        let core = TestRepo::new(
            "core",
            &[
                "https://a.example.com/core/os/x86_64",
                "https://b.example.com/core/os/x86_64/",
            ],
            None,
        );
        let repos: Vec<&dyn RepositoryView> = vec![&core];
        let ranker = FixedRanker(vec![
            // Duplicate of a configured mirror; must not be re-added.
            Mirror {
                url: "https://a.example.com/core/os/x86_64".to_string(),
            },
            Mirror {
                url: "https://c.example.com/core/os/x86_64".to_string(),
            },
        ]);

        let options = QueueOptions {
            fetch_databases: false,
            rank_mirrors: true,
            signature_insistence: 0,
        };
        let official = set_of(&[record("foo", "core")]);
        let queue =
            DownloadQueueBuilder::new(&repos, &ranker).build(&official, &PackageSet::new(), &options);

        assert_eq!(queue.packages.len(), 1);
        assert_eq!(
            queue.packages[0].urls,
            vec![
                "https://a.example.com/core/os/x86_64/foo-1.0.0-1-x86_64.pkg.tar.zst",
                "https://b.example.com/core/os/x86_64/foo-1.0.0-1-x86_64.pkg.tar.zst",
                "https://c.example.com/core/os/x86_64/foo-1.0.0-1-x86_64.pkg.tar.zst",
            ]
        );
    }

    #[test]
    fn test_other_set_never_gets_ranked_mirrors() {
        let aur = TestRepo::new("aur-proxy", &["https://aur.example.com/x86_64"], None);
        let repos: Vec<&dyn RepositoryView> = vec![&aur];
        let ranker = FixedRanker(vec![Mirror {
            url: "https://c.example.com/x86_64".to_string(),
        }]);

        let options = QueueOptions {
            fetch_databases: false,
            rank_mirrors: true,
            signature_insistence: 0,
        };
        let other = set_of(&[record("foo", "aur-proxy")]);
        let queue =
            DownloadQueueBuilder::new(&repos, &ranker).build(&PackageSet::new(), &other, &options);

        assert_eq!(
            queue.packages[0].urls,
            vec!["https://aur.example.com/x86_64/foo-1.0.0-1-x86_64.pkg.tar.zst"]
        );
    }

    #[test]
    fn test_failing_ranker_degrades_to_configured_mirrors() {
        let core = TestRepo::new("core", &["https://a.example.com/core"], None);
        let repos: Vec<&dyn RepositoryView> = vec![&core];

        let options = QueueOptions {
            fetch_databases: false,
            rank_mirrors: true,
            signature_insistence: 0,
        };
        let official = set_of(&[record("foo", "core")]);
        let queue = DownloadQueueBuilder::new(&repos, &FailingRanker)
            .build(&official, &PackageSet::new(), &options);

        assert_eq!(
            queue.packages[0].urls,
            vec!["https://a.example.com/core/foo-1.0.0-1-x86_64.pkg.tar.zst"]
        );
    }

    #[test]
    fn test_package_signature_uses_owning_repository_level() {
        let core = TestRepo::new("core", &["https://a.example.com/core"], Some("Required"));
        let aur = TestRepo::new("aur-proxy", &["https://aur.example.com"], None);
        let repos: Vec<&dyn RepositoryView> = vec![&core, &aur];

        let options = QueueOptions {
            fetch_databases: false,
            rank_mirrors: false,
            signature_insistence: 1,
        };
        let official = set_of(&[record("foo", "core")]);
        let other = set_of(&[record("bar", "aur-proxy")]);
        let queue =
            DownloadQueueBuilder::new(&repos, &NoMirrorRanker).build(&official, &other, &options);

        let foo = queue
            .packages
            .iter()
            .find(|p| p.package.name == "foo")
            .unwrap();
        let bar = queue
            .packages
            .iter()
            .find(|p| p.package.name == "bar")
            .unwrap();
        assert!(foo.want_signature);
        assert!(!bar.want_signature);
    }

    #[test]
    fn test_empty_queue() {
        let repos: Vec<&dyn RepositoryView> = Vec::new();
        let options = QueueOptions::default();
        let queue = DownloadQueueBuilder::new(&repos, &NoMirrorRanker)
            .build(&PackageSet::new(), &PackageSet::new(), &options);
        assert!(queue.is_empty());
    }
}
