//! Targeted attribute extraction from the binary `AndroidManifest.xml`.
//!
//! No document tree is built: elements are streamed and only the
//! attributes a caller names are kept.
//!
//! # Examples
//!
//! ```no_run
//! use apkscope_core::ApkArchive;
//! use apkscope_core::manifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut archive = ApkArchive::open("app.apk")?;
//! let attrs = manifest::decode(&mut archive, &["minSdkVersion", "use32bitAbi"]);
//! if let Some(min_sdk) = attrs.int("minSdkVersion") {
//!     println!("minSdk {min_sdk}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod axml;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::ApkArchive;
use crate::Result;

pub use axml::Attribute;
pub use axml::Element;
pub use axml::walk_elements;

/// Entry name of the manifest inside an APK.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ManifestValue {
    /// Boolean attribute.
    Bool(bool),
    /// Integer or resource reference.
    Int(i64),
    /// String attribute.
    Str(String),
}

impl ManifestValue {
    /// Interprets the value as a boolean; accepts `"true"`/`"false"`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Str(s) => s.parse().ok(),
        }
    }

    /// Interprets the value as an integer; accepts decimal strings.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Str(s) => s.parse().ok(),
        }
    }

    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ManifestValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Requested attributes that were present in the manifest.
///
/// Missing attributes are simply absent; nothing here is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestAttributes {
    values: BTreeMap<String, ManifestValue>,
}

impl ManifestAttributes {
    /// Raw value lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ManifestValue> {
        self.values.get(name)
    }

    /// Boolean lookup.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ManifestValue::as_bool)
    }

    /// Integer lookup.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ManifestValue::as_int)
    }

    /// String lookup.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ManifestValue::as_str)
    }

    /// Number of attributes found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if none of the requested attributes were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decodes the requested attributes from raw manifest bytes.
///
/// The first occurrence of each name in document order wins.
pub fn decode_bytes(data: &[u8], names: &[&str]) -> Result<ManifestAttributes> {
    let mut found = ManifestAttributes::default();
    walk_elements(data, |element| {
        for attr in &element.attributes {
            if names.contains(&attr.name.as_str()) && !found.values.contains_key(&attr.name) {
                found.values.insert(attr.name.clone(), attr.value.clone());
            }
        }
        found.len() < names.len()
    })?;
    Ok(found)
}

/// Decodes the requested attributes from the manifest of `archive`.
///
/// A missing or unreadable manifest yields an empty mapping.
pub fn decode(archive: &mut ApkArchive, names: &[&str]) -> ManifestAttributes {
    match archive.read(MANIFEST_ENTRY).and_then(|data| decode_bytes(&data, names)) {
        Ok(attributes) => attributes,
        Err(e) => {
            debug!(archive = %archive.path().display(), error = %e, "manifest not decodable");
            ManifestAttributes::default()
        }
    }
}

/// Walks the start elements of the manifest in `archive`.
pub fn walk_archive<F>(archive: &mut ApkArchive, visit: F) -> Result<()>
where
    F: FnMut(&Element) -> bool,
{
    let data = archive.read(MANIFEST_ENTRY)?;
    walk_elements(&data, visit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::AttrValue;
    use crate::test_utils::AxmlBuilder;
    use crate::test_utils::write_test_zip;
    use tempfile::TempDir;

    fn sample_manifest() -> Vec<u8> {
        AxmlBuilder::new()
            .start(
                "manifest",
                &[
                    ("package", AttrValue::Str("com.example.app")),
                    ("versionCode", AttrValue::Int(7)),
                ],
            )
            .start("uses-sdk", &[("minSdkVersion", AttrValue::Int(24))])
            .end()
            .start(
                "application",
                &[
                    ("use32bitAbi", AttrValue::Bool(true)),
                    ("multiArch", AttrValue::Bool(false)),
                ],
            )
            .end()
            .end()
            .build()
    }

    #[test]
    fn test_decode_only_requested() {
        let attrs = decode_bytes(&sample_manifest(), &["minSdkVersion", "use32bitAbi"]).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.int("minSdkVersion"), Some(24));
        assert_eq!(attrs.bool("use32bitAbi"), Some(true));
        assert_eq!(attrs.get("package"), None);
    }

    #[test]
    fn test_unknown_attribute_is_absent() {
        let attrs = decode_bytes(&sample_manifest(), &["isolatedSplits"]).unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_decode_from_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.apk");
        write_test_zip(&path, &[(MANIFEST_ENTRY, &sample_manifest())]);

        let mut archive = ApkArchive::open(&path).unwrap();
        let attrs = decode(&mut archive, &["package", "multiArch"]);
        assert_eq!(attrs.str("package"), Some("com.example.app"));
        assert_eq!(attrs.bool("multiArch"), Some(false));
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.apk");
        write_test_zip(&path, &[("classes.dex", b"dex\n035\0")]);

        let mut archive = ApkArchive::open(&path).unwrap();
        assert!(decode(&mut archive, &["package"]).is_empty());
    }

    #[test]
    fn test_garbage_manifest_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.apk");
        write_test_zip(&path, &[(MANIFEST_ENTRY, b"<manifest/>")]);

        let mut archive = ApkArchive::open(&path).unwrap();
        assert!(decode(&mut archive, &["package"]).is_empty());
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(ManifestValue::Str("true".into()).as_bool(), Some(true));
        assert_eq!(ManifestValue::Str("31".into()).as_int(), Some(31));
        assert_eq!(ManifestValue::Int(0).as_bool(), Some(false));
        assert_eq!(ManifestValue::Bool(true).as_str(), None);
    }
}
