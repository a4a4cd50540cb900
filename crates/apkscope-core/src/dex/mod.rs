//! DEX class inventory.
//!
//! Containers are read from the base archive first, then from each split,
//! until the configured container cap is reached. Containers past the cap
//! are not read.

pub mod fold;
pub mod reader;

use tracing::debug;

use crate::ApkArchive;
use crate::InspectConfig;
use crate::PackageHandle;
use crate::archive::ArchiveSet;
use crate::config::DEFAULT_MAX_ENTRY_SIZE;

pub use fold::DexClassSummary;
pub use fold::Folder;

/// Bounds on how much DEX data one scan reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DexLimits {
    /// Containers read per package, base first.
    pub max_containers: usize,
    /// Largest container, in bytes, that is decompressed.
    pub max_entry_size: u64,
}

impl DexLimits {
    /// Container cap with the default entry size limit.
    #[must_use]
    pub const fn new(max_containers: usize) -> Self {
        Self {
            max_containers,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

impl From<&InspectConfig> for DexLimits {
    fn from(config: &InspectConfig) -> Self {
        Self {
            max_containers: config.max_dex_containers,
            max_entry_size: config.max_entry_size,
        }
    }
}

/// Result of [`scan_classes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassScan {
    /// Folded summary of third-party classes.
    pub summary: DexClassSummary,
    /// Whether any class of the Kotlin runtime was seen.
    pub saw_runtime: bool,
    /// Number of DEX containers read.
    pub containers: usize,
}

/// Names of the DEX containers at the root of `archive`, in load order.
pub fn dex_entries(archive: &ApkArchive) -> Vec<String> {
    let mut entries: Vec<(u32, String)> = archive
        .names()
        .filter_map(|name| dex_index(name).map(|i| (i, name.to_string())))
        .collect();
    entries.sort();
    entries.into_iter().map(|(_, name)| name).collect()
}

/// `classes.dex` is 1, `classes2.dex` is 2, and so on.
fn dex_index(name: &str) -> Option<u32> {
    let stem = name.strip_prefix("classes")?.strip_suffix(".dex")?;
    if stem.is_empty() {
        return Some(1);
    }
    stem.parse().ok().filter(|i| *i >= 2)
}

/// Visits the class names of every DEX container up to the container cap.
///
/// The visitor returns `false` to stop. Returns the number of containers
/// read. Unreadable or oversized containers are skipped and still count
/// against the cap.
fn for_each_class<F>(handle: &PackageHandle, limits: DexLimits, mut visit: F) -> usize
where
    F: FnMut(&str) -> bool,
{
    let max_containers = limits.max_containers;
    let mut archives = match ArchiveSet::open(handle) {
        Ok(archives) => archives.with_max_entry_size(limits.max_entry_size),
        Err(e) => {
            debug!(archive = %handle.base().display(), error = %e, "archive unavailable");
            return 0;
        }
    };

    let mut read = 0;
    for archive in archives.iter_mut() {
        for entry in dex_entries(archive) {
            if read >= max_containers {
                debug!(max_containers, "dex container cap reached");
                return read;
            }
            read += 1;
            let names = archive
                .read(&entry)
                .and_then(|data| reader::class_names(&data));
            match names {
                Ok(names) => {
                    for name in &names {
                        if !visit(name) {
                            return read;
                        }
                    }
                }
                Err(e) => debug!(archive = %archive.file_name(), entry = %entry, error = %e, "skipping dex"),
            }
        }
    }
    read
}

/// Builds the folded class summary for a package.
///
/// Classes under `own_package` are left out.
pub fn scan_classes(
    handle: &PackageHandle,
    own_package: Option<&str>,
    limits: DexLimits,
    exceptions: &[String],
) -> ClassScan {
    let mut folder = Folder::new(own_package);
    let containers = for_each_class(handle, limits, |name| {
        folder.push(name);
        true
    });
    let saw_runtime = folder.saw_runtime();
    ClassScan {
        summary: folder.finish(exceptions),
        saw_runtime,
        containers,
    }
}

/// Returns `true` if a class matches `query`.
///
/// `query` is a dotted name or a type descriptor (`Lcom/example/Foo;`). A
/// trailing `*` turns it into a prefix match.
///
/// # Examples
///
/// ```no_run
/// use apkscope_core::PackageHandle;
/// use apkscope_core::dex::DexLimits;
/// use apkscope_core::dex::contains_class;
///
/// let handle = PackageHandle::standalone("app.apk");
/// let uses_compose = contains_class(&handle, "androidx.compose.*", DexLimits::new(5));
/// ```
pub fn contains_class(handle: &PackageHandle, query: &str, limits: DexLimits) -> bool {
    let matcher = ClassQuery::parse(query);
    let mut found = false;
    for_each_class(handle, limits, |name| {
        found = matcher.matches(name);
        !found
    });
    found
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassQuery {
    Exact(String),
    Prefix(String),
}

impl ClassQuery {
    fn parse(query: &str) -> Self {
        let (body, wildcard) = match query.strip_suffix('*') {
            Some(body) => (body, true),
            None => (query, false),
        };
        let dotted = match body.strip_prefix('L') {
            Some(inner) if inner.contains('/') => {
                inner.strip_suffix(';').unwrap_or(inner).replace('/', ".")
            }
            _ => body.to_string(),
        };
        if wildcard {
            Self::Prefix(dotted)
        } else {
            Self::Exact(dotted)
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == exact,
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dex;
    use crate::test_utils::write_test_zip;
    use std::path::Path;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn apk(dir: &Path, name: &str, dexes: &[(&str, &[&str])]) -> PathBuf {
        let built: Vec<(String, Vec<u8>)> = dexes
            .iter()
            .map(|(entry, classes)| ((*entry).to_string(), create_test_dex(classes)))
            .collect();
        let entries: Vec<(&str, &[u8])> = built
            .iter()
            .map(|(n, d)| (n.as_str(), d.as_slice()))
            .collect();
        let path = dir.join(name);
        write_test_zip(&path, &entries);
        path
    }

    #[test]
    fn test_dex_index() {
        assert_eq!(dex_index("classes.dex"), Some(1));
        assert_eq!(dex_index("classes2.dex"), Some(2));
        assert_eq!(dex_index("classes12.dex"), Some(12));
        assert_eq!(dex_index("classes1.dex"), None);
        assert_eq!(dex_index("assets/classes.dex"), None);
        assert_eq!(dex_index("classes.dex.bak"), None);
    }

    #[test]
    fn test_scan_folds_and_flags_runtime() {
        let temp = TempDir::new().unwrap();
        let base = apk(
            temp.path(),
            "base.apk",
            &[
                (
                    "classes.dex",
                    &["com.example.app.Main", "a.b.c.D", "a.b.c.E", "kotlin.Unit"],
                ),
                ("classes2.dex", &["a.b.c.F", "okhttp3.OkHttpClient"]),
            ],
        );

        let scan = scan_classes(&PackageHandle::standalone(base), Some("com.example.app"), DexLimits::new(5), &[]);
        assert!(scan.saw_runtime);
        assert_eq!(scan.containers, 2);
        let entries: Vec<&str> = scan.summary.iter().collect();
        assert_eq!(entries, vec!["a.b.c", "okhttp3.OkHttpClient"]);
    }

    #[test]
    fn test_container_cap_spans_splits() {
        let temp = TempDir::new().unwrap();
        let base = apk(
            temp.path(),
            "base.apk",
            &[("classes.dex", &["a.b.One"]), ("classes2.dex", &["a.b.Two"])],
        );
        let split = apk(temp.path(), "split_feature.apk", &[("classes.dex", &["a.b.Three"])]);
        let handle = PackageHandle::installed(base, vec![split], false);

        let scan = scan_classes(&handle, None, DexLimits::new(2), &[]);
        assert_eq!(scan.containers, 2);
        assert!(!scan.summary.contains("a.b.Three"));

        let scan = scan_classes(&handle, None, DexLimits::new(5), &[]);
        assert!(scan.summary.contains("a.b.Three"));
    }

    #[test]
    fn test_broken_dex_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.apk");
        let good = create_test_dex(&["x.y.Z"]);
        write_test_zip(
            &path,
            &[("classes.dex", b"dex\n035\0truncated"), ("classes2.dex", &good)],
        );

        let scan = scan_classes(&PackageHandle::standalone(path), None, DexLimits::new(5), &[]);
        assert_eq!(scan.containers, 2);
        assert!(scan.summary.contains("x.y.Z"));
    }

    #[test]
    fn test_unreadable_archive_is_empty() {
        let scan = scan_classes(&PackageHandle::standalone("/nonexistent.apk"), None, DexLimits::new(5), &[]);
        assert!(scan.summary.is_empty());
        assert_eq!(scan.containers, 0);
    }

    #[test]
    fn test_contains_class() {
        let temp = TempDir::new().unwrap();
        let base = apk(
            temp.path(),
            "base.apk",
            &[("classes.dex", &["androidx.compose.runtime.Composer", "okio.Buffer"])],
        );
        let handle = PackageHandle::standalone(base);

        assert!(contains_class(&handle, "okio.Buffer", DexLimits::new(5)));
        assert!(contains_class(&handle, "Lokio/Buffer;", DexLimits::new(5)));
        assert!(!contains_class(&handle, "okio.Buff", DexLimits::new(5)));
        assert!(contains_class(&handle, "androidx.compose.*", DexLimits::new(5)));
        assert!(contains_class(&handle, "Landroidx/compose/*", DexLimits::new(5)));
        assert!(!contains_class(&handle, "androidx.media3.*", DexLimits::new(5)));
    }

    #[test]
    fn test_oversized_container_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("base.apk");
        let mut big = create_test_dex(&["big.pkg.Huge"]);
        big.resize(8 * 1024, 0);
        let small = create_test_dex(&["x.y.Z"]);
        write_test_zip(
            &path,
            &[("classes.dex", big.as_slice()), ("classes2.dex", small.as_slice())],
        );
        let limits = DexLimits {
            max_containers: 5,
            max_entry_size: 4 * 1024,
        };

        let scan = scan_classes(&PackageHandle::standalone(&path), None, limits, &[]);
        assert_eq!(scan.containers, 2);
        assert!(scan.summary.contains("x.y.Z"));
        assert!(!scan.summary.contains("big.pkg.Huge"));

        let scan = scan_classes(&PackageHandle::standalone(&path), None, DexLimits::new(5), &[]);
        assert!(scan.summary.contains("big.pkg.Huge"));
    }

    #[test]
    fn test_limits_from_config() {
        let config = InspectConfig {
            max_dex_containers: 3,
            max_entry_size: 1024,
            ..InspectConfig::default()
        };
        assert_eq!(
            DexLimits::from(&config),
            DexLimits {
                max_containers: 3,
                max_entry_size: 1024,
            }
        );
    }

    #[test]
    fn test_query_descriptor_keeps_leading_l_of_name() {
        assert_eq!(ClassQuery::parse("LLib/Foo;"), ClassQuery::Exact("Lib.Foo".to_string()));
        assert_eq!(ClassQuery::parse("Llib/*"), ClassQuery::Prefix("lib.".to_string()));
        assert_eq!(ClassQuery::parse("Lottie"), ClassQuery::Exact("Lottie".to_string()));
    }
}
