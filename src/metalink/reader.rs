// src/metalink/reader.rs

//! Streaming metalink parser
//!
//! Scans element start/end events over the document text without
//! materializing a tree (the same event-loop shape as a repodata parser).
//! Field text overwrites any prior value for that field; when a file
//! carries several `hash` children only the last one survives (an
//! ambiguity inherited from the format, kept as-is rather than picking a
//! "best" hash by type). URL lists are truncated to the first five
//! entries when a `file` element closes.

use crate::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Maximum URLs retained per parsed file entry
pub const MAX_URLS: usize = 5;

/// One parsed `file` entry
///
/// All metadata fields hold the element text verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetalinkEntry {
    /// `name` attribute of the `file` element
    pub filename: String,

    /// Package identity; the key of the result mapping
    pub identity: String,

    /// Byte size, as written
    pub size: String,

    /// Version string
    pub version: String,

    /// Human description
    pub description: String,

    /// Last `hash` element's text; the `type` attribute is not consulted
    pub hash: String,

    /// Candidate URLs, at most `MAX_URLS`, in document order
    pub urls: Vec<String>,
}

/// Parse a metalink document into entries keyed by identity
///
/// File entries without an `identity` child (detached-signature
/// companions) are skipped. Malformed documents fail the whole call.
pub fn parse(xml: &str) -> Result<HashMap<String, MetalinkEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = HashMap::new();
    let mut current = MetalinkEntry::default();
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "file" {
                    current = MetalinkEntry::default();
                    let mut name = None;
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        if attr.key.as_ref() == b"name" {
                            name = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                    current.filename = name.ok_or_else(|| {
                        Error::ParseError("file element missing name attribute".to_string())
                    })?;
                }
                current_tag = tag;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::ParseError(format!("Invalid text content: {}", e)))?
                    .to_string();
                match current_tag.as_str() {
                    "identity" => current.identity = text,
                    "size" => current.size = text,
                    "version" => current.version = text,
                    "description" => current.description = text,
                    "hash" => current.hash = text,
                    "url" => current.urls.push(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"file" {
                    current.urls.truncate(MAX_URLS);
                    if current.identity.is_empty() {
                        debug!("Skipping file entry {} without identity", current.filename);
                        current = MetalinkEntry::default();
                    } else {
                        let entry = std::mem::take(&mut current);
                        entries.insert(entry.identity.clone(), entry);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse metalink: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}
