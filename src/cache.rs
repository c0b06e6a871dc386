// src/cache.rs

//! Cache freshness filtering
//!
//! Before anything is queued for download, packages already present and
//! valid in a local cache directory are pruned. A package is cached-valid
//! when `directory/filename` exists in one of the configured directories
//! and either its SHA-256 or its MD5 checksum matches the record.
//!
//! An absent file is an ordinary mismatch and scanning moves to the next
//! directory; any other I/O failure is fatal for that check.

use crate::package::{PackageRecord, PackageSet};
use crate::Result;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::collections::hash_map::Values;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Determines which packages of a set still need downloading
pub struct CacheFreshnessFilter {
    cache_dirs: Vec<PathBuf>,
}

impl CacheFreshnessFilter {
    /// Create a filter over the given cache directories, scanned in order
    pub fn new(cache_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            cache_dirs: cache_dirs.into_iter().collect(),
        }
    }

    /// Iterate over the packages of `pkgs` that are not cached-valid
    ///
    /// The sequence is finite and single-pass; I/O failures other than a
    /// missing file surface as `Err` items.
    pub fn stale<'a>(&'a self, pkgs: &'a PackageSet) -> Stale<'a> {
        Stale {
            filter: self,
            pkgs: pkgs.into_iter(),
        }
    }

    /// Whether one package is already valid in some cache directory
    fn is_cached(&self, pkg: &PackageRecord) -> Result<bool> {
        for dir in &self.cache_dirs {
            let path = dir.join(&pkg.filename);
            match file_checksums(&path)? {
                Some((sha256, md5)) => {
                    if sha256 == pkg.sha256 || md5 == pkg.md5 {
                        debug!("{} is valid in cache {}", pkg.filename, dir.display());
                        return Ok(true);
                    }
                    debug!("{} has stale checksums in {}", pkg.filename, dir.display());
                }
                None => {
                    // Absent file, same as a mismatch.
                }
            }
        }
        Ok(false)
    }
}

/// Iterator over packages needing (re)download
pub struct Stale<'a> {
    filter: &'a CacheFreshnessFilter,
    pkgs: Values<'a, String, PackageRecord>,
}

impl Iterator for Stale<'_> {
    type Item = Result<PackageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let pkg = self.pkgs.next()?;
            match self.filter.is_cached(pkg) {
                Ok(true) => continue,
                Ok(false) => return Some(Ok(pkg.clone())),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Compute SHA-256 and MD5 of a file in a single read pass
///
/// Returns `Ok(None)` when the file does not exist; every other I/O error
/// propagates.
fn file_checksums(path: &Path) -> Result<Option<(String, String)>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut sha256 = Sha256::new();
    let mut md5 = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        md5.update(&buf[..n]);
    }

    Ok(Some((
        format!("{:x}", sha256.finalize()),
        format!("{:x}", md5.finalize()),
    )))
}
