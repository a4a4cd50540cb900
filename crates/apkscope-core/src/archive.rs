//! Archive access for a package's base and split APKs.
//!
//! Archives are opened right before a scan and dropped when the scan
//! returns, so a file descriptor never outlives one pass over the package.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::InspectError;
use crate::PackageHandle;
use crate::config::DEFAULT_MAX_ENTRY_SIZE;
use crate::Result;
use crate::registry::PackageRecord;

/// Metadata for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry name as stored in the central directory.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// One opened APK.
#[derive(Debug)]
pub struct ApkArchive {
    path: PathBuf,
    zip: zip::ZipArchive<BufReader<File>>,
    max_entry_size: u64,
}

impl ApkArchive {
    /// Opens an APK file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened and `InvalidArchive` if it
    /// is not a ZIP container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
            InspectError::InvalidArchive(format!("{}: {e}", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        })
    }

    /// Sets the largest uncompressed size [`read`](Self::read) accepts.
    #[must_use]
    pub fn with_max_entry_size(mut self, limit: u64) -> Self {
        self.max_entry_size = limit;
        self
    }

    /// Path this archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the archive, for annotating listings.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }

    /// Number of entries in the central directory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zip.is_empty()
    }

    /// Returns `true` if an entry with this exact name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    /// Iterates entry names without touching entry data.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    /// Reads the metadata of entry `index` without decompressing it.
    pub fn entry(&mut self, index: usize) -> Result<EntryInfo> {
        let entry = self
            .zip
            .by_index_raw(index)
            .map_err(|e| InspectError::InvalidArchive(format!("entry {index}: {e}")))?;
        Ok(EntryInfo {
            name: entry.name().to_string(),
            size: entry.size(),
            is_dir: entry.is_dir(),
        })
    }

    /// Reads the metadata of every entry, stopping at the first failure.
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        (0..self.zip.len()).map(|i| self.entry(i)).collect()
    }

    /// Reads a whole entry into memory.
    ///
    /// # Errors
    ///
    /// Returns `MissingEntry` if there is no such entry and `EntryTooLarge`
    /// if it declares or inflates to more than the read limit.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let limit = self.max_entry_size;
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(InspectError::MissingEntry {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(InspectError::InvalidArchive(format!("{name}: {e}"))),
        };
        let too_large = || InspectError::EntryTooLarge {
            name: name.to_string(),
            limit,
        };
        if entry.size() > limit {
            return Err(too_large());
        }

        // The declared size is untrusted; stop one byte past the limit.
        let capacity = usize::try_from(entry.size()).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        entry.by_ref().take(limit.saturating_add(1)).read_to_end(&mut data)?;
        if data.len() as u64 > limit {
            return Err(too_large());
        }
        Ok(data)
    }

    /// Reads an entry as text, replacing invalid UTF-8.
    pub fn read_to_string(&mut self, name: &str) -> Result<String> {
        let data = self.read(name)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

/// The opened base archive plus every split that could be opened.
#[derive(Debug)]
pub struct ArchiveSet {
    archives: Vec<ApkArchive>,
}

impl ArchiveSet {
    /// Opens the base archive and splits of `handle`, base first.
    ///
    /// A split that fails to open is skipped; the base must open.
    pub fn open(handle: &PackageHandle) -> Result<Self> {
        let mut archives = vec![ApkArchive::open(handle.base())?];
        for split in handle.splits() {
            match ApkArchive::open(split) {
                Ok(archive) => archives.push(archive),
                Err(e) => warn!(split = %split.display(), error = %e, "skipping unreadable split"),
            }
        }
        Ok(Self { archives })
    }

    /// Opens the base archive and every split, failing on the first one
    /// that cannot be opened.
    ///
    /// # Errors
    ///
    /// Returns the `Io` or `InvalidArchive` error of the failing archive.
    pub fn open_all(handle: &PackageHandle) -> Result<Self> {
        let archives = std::iter::once(handle.base())
            .chain(handle.splits().iter().map(PathBuf::as_path))
            .map(ApkArchive::open)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { archives })
    }

    /// Applies a read limit to every archive in the set.
    #[must_use]
    pub fn with_max_entry_size(self, limit: u64) -> Self {
        Self {
            archives: self
                .archives
                .into_iter()
                .map(|archive| archive.with_max_entry_size(limit))
                .collect(),
        }
    }

    /// The base archive.
    #[must_use]
    pub fn base(&mut self) -> &mut ApkArchive {
        &mut self.archives[0]
    }

    /// All archives, base first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ApkArchive> {
        self.archives.iter_mut()
    }

    /// Number of opened archives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Always `false`: a set holds at least its base.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}

/// Resolves the archive files behind an installed package.
///
/// Live packages use the split list the registry reports. Frozen packages
/// cannot be queried, so their splits are recovered by scanning the
/// directory that holds the base archive.
///
/// # Errors
///
/// Returns `NoArchive` if the base archive does not exist.
pub fn resolve_handle(record: &PackageRecord) -> Result<PackageHandle> {
    let base = &record.source_dir;
    if !base.is_file() {
        return Err(InspectError::NoArchive { path: base.clone() });
    }

    let splits = if record.frozen {
        discover_splits(base)
    } else {
        record.split_source_dirs.clone()
    };
    debug!(package = %record.id, splits = splits.len(), frozen = record.frozen, "resolved archives");

    Ok(
        PackageHandle::installed(base.clone(), splits, record.frozen)
            .with_native_library_dir(record.native_library_dir.clone()),
    )
}

/// Lists `split_*.apk` files next to `base`, sorted by name.
pub fn discover_splits(base: &Path) -> Vec<PathBuf> {
    let Some(dir) = base.parent() else {
        return Vec::new();
    };
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut splits: Vec<PathBuf> = read_dir
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.as_path() != base && path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_split_name)
        })
        .collect();
    splits.sort();
    splits
}

/// Returns `true` for split archive file names such as
/// `split_config.arm64_v8a.apk`.
#[must_use]
pub fn is_split_name(file_name: &str) -> bool {
    file_name.starts_with("split_")
        && file_name.len() > "split_.apk".len()
        && file_name.ends_with(".apk")
}
