// src/lib.rs

//! Pacmeta
//!
//! Computes the complete, verifiable set of files needed to install a
//! requested set of packages from repository snapshots, and emits that set
//! as a mirror-aware metalink document a downloader can consume.
//!
//! # Architecture
//!
//! - Collaborator-driven: repositories, the local install database, the
//!   group prompt, and the mirror ranker are injected capabilities
//! - Resolution: transitive dependency closure over prioritized repository
//!   views, with ignore rules and trust classification
//! - Cache awareness: packages already valid in a local cache directory
//!   (sha256 or md5 match) are pruned before queueing
//! - Metalink: fixed-order XML build and streaming parse, namespace
//!   `urn:ietf:params:xml:ns:metalink`

pub mod cache;
mod error;
pub mod metalink;
pub mod package;
pub mod queue;
pub mod repository;
pub mod resolver;

pub use error::{Error, Result};
