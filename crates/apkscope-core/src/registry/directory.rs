//! Registry backed by a directory tree of installed app folders.
//!
//! Layout, one folder per package:
//!
//! ```text
//! <root>/<folder>/base.apk
//! <root>/<folder>/split_config.arm64_v8a.apk
//! <root>/<folder>/lib/arm64/libfoo.so
//! ```
//!
//! There is no live state to query, so every record is frozen and carries
//! no primary-ABI hint: the ABI is recovered from the archives themselves.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::ApkArchive;
use crate::InspectError;
use crate::Result;
use crate::archive::discover_splits;
use crate::manifest;
use crate::registry::EnabledSetting;
use crate::registry::PackageRecord;
use crate::registry::PackageRegistry;

const BASE_APK: &str = "base.apk";

/// [`PackageRegistry`] over a directory of unpacked installs.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
    packages: BTreeMap<String, PackageRecord>,
}

impl DirectoryRegistry {
    /// Scans `root` for `*/base.apk` and indexes each by its manifest
    /// package name.
    ///
    /// Folders whose base archive has no readable package name are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Io` if `root` is not a readable directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            )
            .into());
        }

        let mut packages = BTreeMap::new();
        let walker = walkdir::WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker.flatten() {
            if !entry.file_type().is_file() || entry.file_name() != BASE_APK {
                continue;
            }
            match record_for(entry.path()) {
                Ok(record) => {
                    debug!(package = %record.id, path = %entry.path().display(), "indexed package");
                    packages.entry(record.id.clone()).or_insert(record);
                }
                Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping folder"),
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            packages,
        })
    }

    /// Directory this registry was built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns `true` if no package was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn record_for(base: &Path) -> Result<PackageRecord> {
    let mut archive = ApkArchive::open(base)?;
    let attrs = manifest::decode(&mut archive, &["package"]);
    let id = attrs
        .str("package")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| InspectError::MalformedManifest("no package name".to_string()))?
        .to_string();

    let mut record = PackageRecord::new(id, base);
    record.frozen = true;
    record.split_source_dirs = discover_splits(base);
    record.native_library_dir = base
        .parent()
        .map(|dir| dir.join("lib"))
        .filter(|lib| lib.is_dir());
    Ok(record)
}

impl PackageRegistry for DirectoryRegistry {
    fn package(&self, id: &str) -> Result<PackageRecord> {
        self.packages
            .get(id)
            .cloned()
            .ok_or_else(|| InspectError::PackageNotFound { id: id.to_string() })
    }

    fn installed_packages(&self) -> Result<Vec<PackageRecord>> {
        Ok(self.packages.values().cloned().collect())
    }

    fn component_enabled_setting(&self, package: &str, _component: &str) -> Result<EnabledSetting> {
        if self.packages.contains_key(package) {
            Ok(EnabledSetting::Default)
        } else {
            Err(InspectError::PackageNotFound {
                id: package.to_string(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_ENTRY;
    use crate::test_utils::AttrValue;
    use crate::test_utils::AxmlBuilder;
    use crate::test_utils::write_test_zip;
    use tempfile::TempDir;

    fn install(root: &Path, folder: &str, package: &str) -> PathBuf {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = AxmlBuilder::new()
            .leaf("manifest", &[("package", AttrValue::Str(package))])
            .build();
        let base = dir.join(BASE_APK);
        write_test_zip(&base, &[(MANIFEST_ENTRY, &manifest)]);
        base
    }

    #[test]
    fn test_indexes_by_manifest_package() {
        let temp = TempDir::new().unwrap();
        install(temp.path(), "com.a-1", "com.a");
        install(temp.path(), "com.b-xyz", "com.b");

        let registry = DirectoryRegistry::open(temp.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let record = registry.package("com.b").unwrap();
        assert!(record.frozen);
        assert!(record.primary_cpu_abi.is_none());
        assert!(record.source_dir.ends_with("com.b-xyz/base.apk"));
    }

    #[test]
    fn test_picks_up_splits_and_lib_dir() {
        let temp = TempDir::new().unwrap();
        let base = install(temp.path(), "app", "com.example");
        let dir = base.parent().unwrap();
        write_test_zip(&dir.join("split_config.arm64_v8a.apk"), &[("a", b"a")]);
        std::fs::create_dir_all(dir.join("lib/arm64")).unwrap();

        let registry = DirectoryRegistry::open(temp.path()).unwrap();
        let record = registry.package("com.example").unwrap();
        assert_eq!(record.split_source_dirs.len(), 1);
        assert_eq!(record.native_library_dir, Some(dir.join("lib")));
    }

    #[test]
    fn test_skips_folders_without_package_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        write_test_zip(&dir.join(BASE_APK), &[("classes.dex", b"")]);
        install(temp.path(), "ok", "com.ok");

        let registry = DirectoryRegistry::open(temp.path()).unwrap();
        let ids: Vec<String> = registry
            .installed_packages()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["com.ok"]);
    }

    #[test]
    fn test_unknown_package() {
        let temp = TempDir::new().unwrap();
        let registry = DirectoryRegistry::open(temp.path()).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.package("com.missing"),
            Err(InspectError::PackageNotFound { .. })
        ));
        assert!(registry.component_enabled_setting("com.missing", ".Main").is_err());
    }

    #[test]
    fn test_root_must_exist() {
        let result = DirectoryRegistry::open("/nonexistent/apps");
        assert!(matches!(result, Err(InspectError::Io(_))));
    }
}
