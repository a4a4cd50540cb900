//! Library and listing entry types.

use std::collections::HashSet;

use serde::Serialize;

/// One named, sized entry in a listing.
///
/// Depending on the listing this is a native library, a metadata key/value
/// pair (value carried in `source`), or a permission string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    /// Entry name.
    pub name: String,
    /// Size in bytes, `0` when the listing has no notion of size.
    pub size: u64,
    /// Free-form annotation: origin archive, metadata value, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LibraryEntry {
    /// Creates an entry without annotation.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            source: None,
        }
    }

    /// Attaches an annotation.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Drops every entry whose name was already seen, keeping the first.
pub fn dedup_by_name(entries: &mut Vec<LibraryEntry>) {
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.name.clone()));
}

/// A static shared library the package depends on.
///
/// Only produced when the archive's declaration and the registered
/// shared-library file list agree on the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticLibraryEntry {
    /// Library name as declared in the manifest.
    pub name: String,
    /// Declared version.
    pub version: i64,
    /// Shared-library file that provides it.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first() {
        let mut entries = vec![
            LibraryEntry::new("libfoo.so", 10).with_source("base.apk"),
            LibraryEntry::new("libbar.so", 20),
            LibraryEntry::new("libfoo.so", 30).with_source("split_config.arm64_v8a.apk"),
        ];
        dedup_by_name(&mut entries);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].size, 10);
        assert_eq!(entries[0].source.as_deref(), Some("base.apk"));
    }
}
