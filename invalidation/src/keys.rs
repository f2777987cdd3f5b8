//! Key normalization.

use std::path::{Component, Path};

/// Converts a path relative to the site directory into an object key.
///
/// Components are joined with `/` whatever the platform separator is; `.`
/// components are dropped.
pub fn key_name_from_path(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

/// Name of the document a CDN serves for directory requests, e.g.
/// `index.html`.
///
/// Invalidating `dir/` rather than `dir/index.html` is what actually refreshes
/// the directory URL, so keys naming an index document are folded into their
/// directory before planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument(String);

impl IndexDocument {
    /// Creates an index document matcher for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The document name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Strips the index document from `key` if its last segment is exactly
    /// the document name. Other keys are returned unchanged.
    pub fn fold<'k>(&self, key: &'k str) -> &'k str {
        match key.strip_suffix(self.0.as_str()) {
            Some(dir) if dir.is_empty() || dir.ends_with('/') => dir,
            _ => key,
        }
    }
}
