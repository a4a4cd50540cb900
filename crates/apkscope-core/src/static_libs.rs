//! Static shared-library resolution.

use tracing::debug;

use crate::ApkArchive;
use crate::PackageHandle;
use crate::Result;
use crate::StaticLibraryEntry;
use crate::manifest;

/// One `<uses-static-library>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    name: String,
    version: i64,
}

/// Pairs the static libraries declared in the manifest with the registered
/// shared-library files.
///
/// A library is reported only when a file path in `shared_library_files`
/// contains its declared name. A missing declaration table, an empty file
/// list or any decode failure all mean "no static libraries".
pub fn resolve_static_libraries(
    handle: &PackageHandle,
    shared_library_files: &[String],
) -> Vec<StaticLibraryEntry> {
    if shared_library_files.is_empty() {
        return Vec::new();
    }

    let declarations = match read_declarations(handle) {
        Ok(declarations) => declarations,
        Err(e) => {
            debug!(archive = %handle.base().display(), error = %e, "no static library table");
            return Vec::new();
        }
    };

    let mut entries: Vec<StaticLibraryEntry> = Vec::new();
    for declaration in declarations {
        if entries.iter().any(|e| e.name == declaration.name) {
            continue;
        }
        if let Some(path) = shared_library_files
            .iter()
            .find(|path| path.contains(&declaration.name))
        {
            entries.push(StaticLibraryEntry {
                name: declaration.name,
                version: declaration.version,
                path: path.clone(),
            });
        }
    }
    entries
}

fn read_declarations(handle: &PackageHandle) -> Result<Vec<Declaration>> {
    let mut archive = ApkArchive::open(handle.base())?;
    let mut declarations = Vec::new();
    manifest::walk_archive(&mut archive, |element| {
        if element.name == "uses-static-library"
            && let Some(name) = element.attr_str("name").filter(|n| !n.is_empty())
        {
            declarations.push(Declaration {
                name: name.to_string(),
                version: element.attr("version").and_then(|v| v.as_int()).unwrap_or(0),
            });
        }
        true
    })?;
    Ok(declarations)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_ENTRY;
    use crate::test_utils::AttrValue;
    use crate::test_utils::AxmlBuilder;
    use crate::test_utils::write_test_zip;
    use std::path::Path;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn package_with_static_libs(dir: &Path) -> PathBuf {
        let manifest = AxmlBuilder::new()
            .start("manifest", &[("package", AttrValue::Str("com.example"))])
            .start("application", &[])
            .leaf(
                "uses-static-library",
                &[
                    ("name", AttrValue::Str("com.google.android.trichromelibrary")),
                    ("version", AttrValue::Int(573_114_333)),
                    ("certDigest", AttrValue::Str("ab:cd")),
                ],
            )
            .leaf(
                "uses-static-library",
                &[("name", AttrValue::Str("com.vendor.unregistered")), ("version", AttrValue::Int(2))],
            )
            .end()
            .end()
            .build();
        let path = dir.join("base.apk");
        write_test_zip(&path, &[(MANIFEST_ENTRY, &manifest)]);
        path
    }

    #[test]
    fn test_pairs_declared_and_registered() {
        let temp = TempDir::new().unwrap();
        let handle = PackageHandle::installed(package_with_static_libs(temp.path()), vec![], false);
        let files = vec![
            "/system/framework/android.test.base.jar".to_string(),
            "/data/app/~~x/com.google.android.trichromelibrary_573114333-1/base.apk".to_string(),
        ];

        let libs = resolve_static_libraries(&handle, &files);
        assert_eq!(libs.len(), 1);
        assert_eq!(libs[0].name, "com.google.android.trichromelibrary");
        assert_eq!(libs[0].version, 573_114_333);
        assert!(libs[0].path.ends_with("base.apk"));
    }

    #[test]
    fn test_empty_file_list_means_none() {
        let temp = TempDir::new().unwrap();
        let handle = PackageHandle::installed(package_with_static_libs(temp.path()), vec![], false);
        assert!(resolve_static_libraries(&handle, &[]).is_empty());
    }

    #[test]
    fn test_no_declarations_means_none() {
        let temp = TempDir::new().unwrap();
        let manifest = AxmlBuilder::new().leaf("manifest", &[]).build();
        let path = temp.path().join("base.apk");
        write_test_zip(&path, &[(MANIFEST_ENTRY, &manifest)]);
        let handle = PackageHandle::installed(path, vec![], false);

        let libs = resolve_static_libraries(&handle, &["/data/app/lib.apk".to_string()]);
        assert!(libs.is_empty());
    }

    #[test]
    fn test_decode_failure_means_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.apk");
        write_test_zip(&path, &[(MANIFEST_ENTRY, b"garbage")]);
        let handle = PackageHandle::installed(path, vec![], false);

        let libs = resolve_static_libraries(&handle, &["/data/app/lib.apk".to_string()]);
        assert!(libs.is_empty());
    }
}
