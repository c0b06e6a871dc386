// src/metalink/mod.rs

//! Metalink document build and parse
//!
//! This module provides both directions of the manifest format:
//! - `writer`: accumulate file entries and serialize them in one pass
//! - `reader`: streaming parse of a metalink document into keyed records
//!
//! The format is RFC 5854 metalink, namespace
//! `urn:ietf:params:xml:ns:metalink`: a `metalink` root holding `file`
//! elements (attribute `name`), each with `identity`, `size`, `version`,
//! `description`, `hash` (attribute `type`) and `url` children.

pub mod reader;
pub mod writer;

pub use reader::{parse, MetalinkEntry};
pub use writer::Metalink;

/// XML namespace declared on the document root
pub const METALINK_NAMESPACE: &str = "urn:ietf:params:xml:ns:metalink";
