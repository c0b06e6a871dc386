// src/metalink/writer.rs

//! Metalink document builder
//!
//! Accumulates immutable file entries and serializes them in a single
//! pass. Package entries carry their children in fixed order: identity,
//! size, version, description, sha256 hash, md5 hash, then every URL in
//! the order supplied (no cap when building). Any entry may be paired
//! with a `.sig` companion whose URLs are the parent's suffixed `.sig`.
//!
//! The output is pretty-printed one element per line with single-space
//! indentation and leaf text inline with its tags; downstream consumers
//! depend on that exact shape.

use super::METALINK_NAMESPACE;
use crate::queue::{join_url, DatabaseRequest, DownloadQueue, PackageRequest};
use crate::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

/// One `file` element of the document
#[derive(Debug, Clone)]
struct FileEntry {
    name: String,
    fields: Option<PackageFields>,
    urls: Vec<String>,
}

/// Metadata children of a package entry, in serialization order
#[derive(Debug, Clone)]
struct PackageFields {
    identity: String,
    size: u64,
    version: String,
    description: String,
    sha256: String,
    md5: String,
}

/// Builder for a metalink document
#[derive(Debug, Clone, Default)]
pub struct Metalink {
    files: Vec<FileEntry>,
}

impl Metalink {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a complete download queue
    pub fn from_queue(queue: &DownloadQueue) -> Self {
        let mut metalink = Metalink::new();
        for db in &queue.databases {
            metalink.add_database(db);
        }
        for pkg in &queue.packages {
            metalink.add_package(pkg);
        }
        metalink
    }

    /// Add a repository database entry (`<name>.db`, one URL per server)
    pub fn add_database(&mut self, db: &DatabaseRequest) {
        let filename = format!("{}.db", db.name);
        let urls: Vec<String> = db
            .servers
            .iter()
            .map(|server| join_url(server, &filename))
            .collect();
        debug!("Adding database entry {} with {} URLs", filename, urls.len());
        self.files.push(FileEntry {
            name: filename.clone(),
            fields: None,
            urls: urls.clone(),
        });
        if db.want_signature {
            self.add_signature_for(&filename, &urls);
        }
    }

    /// Add a package entry with full metadata children
    pub fn add_package(&mut self, req: &PackageRequest) {
        let pkg = &req.package;
        debug!("Adding package entry {} with {} URLs", pkg.filename, req.urls.len());
        self.files.push(FileEntry {
            name: pkg.filename.clone(),
            fields: Some(PackageFields {
                identity: pkg.name.clone(),
                size: pkg.size,
                version: pkg.version.clone(),
                description: pkg.description.clone(),
                sha256: pkg.sha256.clone(),
                md5: pkg.md5.clone(),
            }),
            urls: req.urls.clone(),
        });
        if req.want_signature {
            self.add_signature_for(&pkg.filename, &req.urls);
        }
    }

    /// Add a detached-signature companion entry
    fn add_signature_for(&mut self, name: &str, urls: &[String]) {
        self.files.push(FileEntry {
            name: format!("{}.sig", name),
            fields: None,
            urls: urls.iter().map(|url| format!("{}.sig", url)).collect(),
        });
    }

    /// Whether the document holds no file entries
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Serialize the document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_err)?;

        let mut root = BytesStart::new("metalink");
        root.push_attribute(("xmlns", METALINK_NAMESPACE));
        writer.write_event(Event::Start(root)).map_err(write_err)?;

        for file in &self.files {
            let mut start = BytesStart::new("file");
            start.push_attribute(("name", file.name.as_str()));
            writer.write_event(Event::Start(start)).map_err(write_err)?;

            if let Some(fields) = &file.fields {
                write_leaf(&mut writer, "identity", &[], &fields.identity)?;
                write_leaf(&mut writer, "size", &[], &fields.size.to_string())?;
                write_leaf(&mut writer, "version", &[], &fields.version)?;
                write_leaf(&mut writer, "description", &[], &fields.description)?;
                write_leaf(&mut writer, "hash", &[("type", "sha256")], &fields.sha256)?;
                write_leaf(&mut writer, "hash", &[("type", "md5")], &fields.md5)?;
            }
            for url in &file.urls {
                write_leaf(&mut writer, "url", &[], url)?;
            }

            writer
                .write_event(Event::End(BytesEnd::new("file")))
                .map_err(write_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("metalink")))
            .map_err(write_err)?;

        String::from_utf8(writer.into_inner()).map_err(|e| Error::WriteError(e.to_string()))
    }
}

/// Write a leaf element with its text inline: `<tag>text</tag>`
fn write_leaf<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new(tag);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    writer.write_event(Event::Start(start)).map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(write_err)?;
    Ok(())
}

fn write_err(e: impl std::fmt::Display) -> Error {
    Error::WriteError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(name: &str, servers: &[&str], want_signature: bool) -> DatabaseRequest {
        DatabaseRequest {
            name: name.to_string(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
            want_signature,
        }
    }

    fn package(name: &str, urls: &[&str], want_signature: bool) -> PackageRequest {
        PackageRequest {
            package: crate::package::PackageRecord {
                name: name.to_string(),
                version: "1.0.0-1".to_string(),
                size: 2048,
                description: format!("test package {}", name),
                filename: format!("{}-1.0.0-1-x86_64.pkg.tar.zst", name),
                architecture: "x86_64".to_string(),
                sha256: "aa".repeat(32),
                md5: "bb".repeat(16),
                repository: "core".to_string(),
                groups: Vec::new(),
                depends: Vec::new(),
            },
            urls: urls.iter().map(|u| u.to_string()).collect(),
            want_signature,
        }
    }

    #[test]
    fn test_database_entry_serialization_is_stable() {
        let mut metalink = Metalink::new();
        metalink.add_database(&database(
            "core",
            &["https://mirror.example.com/core/os/x86_64"],
            false,
        ));

        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
            <metalink xmlns=\"urn:ietf:params:xml:ns:metalink\">\n \
            <file name=\"core.db\">\n  \
            <url>https://mirror.example.com/core/os/x86_64/core.db</url>\n \
            </file>\n\
            </metalink>";
        assert_eq!(metalink.to_xml().unwrap(), expected);
    }

    #[test]
    fn test_package_children_in_fixed_order() {
        let mut metalink = Metalink::new();
        metalink.add_package(&package(
            "foo",
            &["https://a.example.com/foo-1.0.0-1-x86_64.pkg.tar.zst"],
            false,
        ));

        let xml = metalink.to_xml().unwrap();
        let identity = xml.find("<identity>").unwrap();
        let size = xml.find("<size>").unwrap();
        let version = xml.find("<version>").unwrap();
        let description = xml.find("<description>").unwrap();
        let sha256 = xml.find("<hash type=\"sha256\">").unwrap();
        let md5 = xml.find("<hash type=\"md5\">").unwrap();
        let url = xml.find("<url>").unwrap();
        assert!(identity < size);
        assert!(size < version);
        assert!(version < description);
        assert!(description < sha256);
        assert!(sha256 < md5);
        assert!(md5 < url);
    }

    #[test]
    fn test_leaf_text_stays_on_one_line() {
        let mut metalink = Metalink::new();
        metalink.add_package(&package("foo", &["https://a.example.com/foo.pkg"], false));

        let xml = metalink.to_xml().unwrap();
        assert!(xml.contains("<identity>foo</identity>"));
        assert!(xml.contains("<size>2048</size>"));
        for line in xml.lines() {
            assert!(!line.trim().is_empty(), "no whitespace-only lines");
        }
    }

    #[test]
    fn test_signature_companion_entries() {
        let mut metalink = Metalink::new();
        metalink.add_package(&package(
            "foo",
            &["https://a.example.com/foo-1.0.0-1-x86_64.pkg.tar.zst"],
            true,
        ));

        let xml = metalink.to_xml().unwrap();
        assert!(xml.contains("name=\"foo-1.0.0-1-x86_64.pkg.tar.zst.sig\""));
        assert!(xml
            .contains("<url>https://a.example.com/foo-1.0.0-1-x86_64.pkg.tar.zst.sig</url>"));
        // The companion carries URLs only, no metadata children.
        assert_eq!(xml.matches("<identity>").count(), 1);
    }

    #[test]
    fn test_database_signature_entry() {
        let mut metalink = Metalink::new();
        metalink.add_database(&database(
            "core",
            &["https://mirror.example.com/core/os/x86_64"],
            true,
        ));

        let xml = metalink.to_xml().unwrap();
        assert!(xml.contains("name=\"core.db.sig\""));
        assert!(
            xml.contains("<url>https://mirror.example.com/core/os/x86_64/core.db.sig</url>")
        );
    }

    #[test]
    fn test_build_path_does_not_cap_urls() {
        let urls: Vec<String> = (0..7).map(|i| format!("https://m{}.example.com/foo.pkg", i)).collect();
        let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        let mut metalink = Metalink::new();
        metalink.add_package(&package("foo", &url_refs, false));

        let xml = metalink.to_xml().unwrap();
        assert_eq!(xml.matches("<url>").count(), 7);
    }

    #[test]
    fn test_from_queue_preserves_queue_order() {
        let mut queue = DownloadQueue::default();
        queue.add_database(database("core", &["https://a.example.com/core"], false));
        queue.add_package(package("foo", &["https://a.example.com/foo.pkg"], false));
        queue.add_package(package("bar", &["https://a.example.com/bar.pkg"], false));

        let xml = Metalink::from_queue(&queue).to_xml().unwrap();
        let db = xml.find("name=\"core.db\"").unwrap();
        let foo = xml.find("<identity>foo</identity>").unwrap();
        let bar = xml.find("<identity>bar</identity>").unwrap();
        assert!(db < foo);
        assert!(foo < bar);
    }

    #[test]
    fn test_empty_document() {
        let metalink = Metalink::new();
        assert!(metalink.is_empty());
        let xml = metalink.to_xml().unwrap();
        assert!(xml.contains("<metalink xmlns=\"urn:ietf:params:xml:ns:metalink\">"));
    }
}
