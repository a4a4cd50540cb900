//! ABI resolution.
//!
//! Two steps: [`AbiResolver::resolve_abi_set`] collects every architecture
//! physically present in the archives, and [`AbiResolver::resolve_abi`]
//! reconciles that set with the installer's primary-ABI hint and the
//! manifest flags into one [`AbiClassification`].

use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::Abi;
use crate::AbiClassification;
use crate::AbiSet;
use crate::ApkArchive;
use crate::InspectConfig;
use crate::LibraryEntry;
use crate::PackageHandle;
use crate::Result;
use crate::archive::ArchiveSet;
use crate::device::DeviceProfile;
use crate::manifest;
use crate::registry::PackageRecord;
use crate::types::library::dedup_by_name;

const LIB_PREFIX: &str = "lib/";

/// Switches for one ABI set scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Short-circuit to the overlay sentinel without scanning.
    pub is_overlay: bool,
    /// Count architectures the device cannot run.
    pub ignore_device_filter: bool,
}

/// Registry-side signals feeding [`AbiResolver::resolve_abi`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiHints {
    /// Primary ABI chosen by the installer, as a `lib/` directory name.
    pub primary_abi: Option<String>,
    /// The package is a resource overlay.
    pub is_overlay: bool,
    /// Caller-supplied architecture that replaces every other signal except
    /// the overlay flag.
    pub override_abi: Option<Abi>,
}

impl AbiHints {
    /// Hints taken from a registry record.
    #[must_use]
    pub fn from_record(record: &PackageRecord) -> Self {
        Self {
            primary_abi: record.primary_cpu_abi.clone(),
            is_overlay: record.is_overlay,
            override_abi: None,
        }
    }

    /// Sets the explicit architecture override.
    #[must_use]
    pub fn with_override(mut self, abi: Option<Abi>) -> Self {
        self.override_abi = abi;
        self
    }
}

/// Resolves ABIs against one device.
#[derive(Debug, Clone)]
pub struct AbiResolver<'a> {
    device: &'a DeviceProfile,
    max_entries: usize,
}

impl<'a> AbiResolver<'a> {
    /// Creates a resolver for `device` using the scan cap from `config`.
    #[must_use]
    pub fn new(device: &'a DeviceProfile, config: &InspectConfig) -> Self {
        Self {
            device,
            max_entries: config.max_abi_entries.max(1),
        }
    }

    /// Collects the architectures present in the package's archives.
    ///
    /// Never returns an empty set: no architecture yields the
    /// `NoLibraries` sentinel and any I/O failure yields only `Error`.
    pub fn resolve_abi_set(&self, handle: &PackageHandle, options: ScanOptions) -> AbiSet {
        if options.is_overlay {
            return AbiSet::sentinel(Abi::Overlay);
        }

        let mut set = match self.scan_archives(handle, options.ignore_device_filter) {
            Ok(set) => set,
            Err(e) => {
                warn!(archive = %handle.base().display(), error = %e, "ABI scan failed");
                return AbiSet::sentinel(Abi::Error);
            }
        };

        if set.is_empty()
            && !handle.is_standalone()
            && let Some(dir) = handle.native_library_dir()
        {
            set = installed_isa_dirs(dir);
            debug!(dir = %dir.display(), found = set.len(), "fell back to native library dir");
        }

        if set.is_empty() {
            AbiSet::sentinel(Abi::NoLibraries)
        } else {
            set
        }
    }

    fn scan_archives(&self, handle: &PackageHandle, ignore_device_filter: bool) -> Result<AbiSet> {
        let mut archives = ArchiveSet::open_all(handle)?;
        let mut set = AbiSet::new();
        for archive in archives.iter_mut() {
            for index in 0..archive.len() {
                let entry = archive.entry(index)?;
                if entry.is_dir {
                    continue;
                }
                let Some(abi) = lib_entry_abi(&entry.name) else {
                    continue;
                };
                if !ignore_device_filter && !self.device.supports(abi) {
                    continue;
                }
                set.insert(abi);
                if set.len() >= self.max_entries {
                    return Ok(set);
                }
            }
        }
        Ok(set)
    }

    /// Produces the final classification for a package.
    ///
    /// `set` is the result of an earlier [`resolve_abi_set`] call with the
    /// device filter ignored; when `None` it is computed on demand.
    ///
    /// [`resolve_abi_set`]: Self::resolve_abi_set
    pub fn resolve_abi(
        &self,
        handle: &PackageHandle,
        hints: &AbiHints,
        set: Option<&AbiSet>,
    ) -> AbiClassification {
        if hints.is_overlay {
            return AbiClassification::new(Abi::Overlay);
        }

        let flags = ManifestAbiFlags::read(handle.base());

        let abi = if let Some(abi) = hints.override_abi {
            abi
        } else {
            match hints.primary_abi.as_deref().filter(|hint| !hint.is_empty()) {
                Some(hint) => Abi::from_dir_name(hint).unwrap_or_else(|| {
                    debug!(hint, "unrecognized primary ABI hint");
                    Abi::Error
                }),
                None if handle.is_frozen() => {
                    let computed;
                    let set = if let Some(set) = set {
                        set
                    } else {
                        computed = self.resolve_abi_set(
                            handle,
                            ScanOptions {
                                is_overlay: false,
                                ignore_device_filter: true,
                            },
                        );
                        &computed
                    };
                    self.rank(set, flags.use_32bit_abi)
                }
                None => Abi::NoLibraries,
            }
        };

        if abi == Abi::Error {
            return AbiClassification::new(Abi::Error);
        }
        AbiClassification::new(abi).with_multi_arch(flags.multi_arch)
    }

    /// Picks the best architecture from `set` that the device can run.
    fn rank(&self, set: &AbiSet, use_32bit_abi: bool) -> Abi {
        if let Some(sentinel) = set.as_sentinel() {
            return match sentinel {
                Abi::NoLibraries => Abi::NoLibraries,
                _ => Abi::Error,
            };
        }

        let prefer_64 = self.device.is_64_bit && !use_32bit_abi;
        let mut candidates: Vec<Abi> = set
            .ranked()
            .into_iter()
            .filter(|abi| self.device.supports(*abi))
            .filter(|abi| !(use_32bit_abi && abi.is_64_bit()))
            .collect();
        candidates.sort_by_key(|abi| (prefer_64 && !abi.is_64_bit(), abi.rank()));
        candidates.first().copied().unwrap_or(Abi::Error)
    }
}

/// ABI-related manifest flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ManifestAbiFlags {
    use_32bit_abi: bool,
    multi_arch: bool,
}

impl ManifestAbiFlags {
    fn read(base: &Path) -> Self {
        let Ok(mut archive) = ApkArchive::open(base) else {
            return Self::default();
        };
        let attrs = manifest::decode(&mut archive, &["use32bitAbi", "multiArch"]);
        Self {
            use_32bit_abi: attrs.bool("use32bitAbi").unwrap_or(false),
            multi_arch: attrs.bool("multiArch").unwrap_or(false),
        }
    }
}

/// Architecture of an entry such as `lib/arm64-v8a/libfoo.so`.
fn lib_entry_abi(name: &str) -> Option<Abi> {
    let rest = name.strip_prefix(LIB_PREFIX)?;
    let (dir, file) = rest.split_once('/')?;
    if file.is_empty() {
        return None;
    }
    Abi::from_dir_name(dir)
}

fn installed_isa_dirs(dir: &Path) -> AbiSet {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return AbiSet::new();
    };
    let mut names: Vec<String> = read_dir
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.iter().filter_map(|name| Abi::from_isa_dir(name)).collect()
}

/// Lists the native libraries shipped for `abi`, sorted by name.
///
/// Libraries are read from `lib/<abi>/` across base and splits; an
/// installed package whose archives ship none falls back to the extracted
/// copies in its native-library directory.
pub fn native_libraries(handle: &PackageHandle, abi: Abi) -> Vec<LibraryEntry> {
    let Some(dir_name) = abi.dir_name() else {
        return Vec::new();
    };
    let prefix = format!("{LIB_PREFIX}{dir_name}/");

    let mut libraries = match ArchiveSet::open(handle) {
        Ok(mut archives) => {
            let mut found = Vec::new();
            for archive in archives.iter_mut() {
                let source = archive.file_name();
                for index in 0..archive.len() {
                    let entry = match archive.entry(index) {
                        Ok(entry) => entry,
                        Err(e) => {
                            debug!(archive = %source, index, error = %e, "skipping unreadable entry");
                            continue;
                        }
                    };
                    let Some(file) = entry.name.strip_prefix(&prefix) else {
                        continue;
                    };
                    if entry.is_dir || file.is_empty() || file.contains('/') {
                        continue;
                    }
                    found.push(LibraryEntry::new(file, entry.size).with_source(source.clone()));
                }
            }
            found
        }
        Err(e) => {
            debug!(archive = %handle.base().display(), error = %e, "archive unavailable");
            Vec::new()
        }
    };

    if libraries.is_empty()
        && !handle.is_standalone()
        && let (Some(dir), Some(isa)) = (handle.native_library_dir(), abi.isa_dir_name())
    {
        libraries = extracted_libraries(&dir.join(isa));
    }

    dedup_by_name(&mut libraries);
    libraries.sort_by(|a, b| a.name.cmp(&b.name));
    libraries
}

fn extracted_libraries(dir: &Path) -> Vec<LibraryEntry> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            metadata.is_file().then(|| {
                LibraryEntry::new(entry.file_name().to_string_lossy(), metadata.len())
                    .with_source(dir.display().to_string())
            })
        })
        .collect()
}
