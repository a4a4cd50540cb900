//! Flat record assembled for one inspected package.

use std::path::PathBuf;

use serde::Serialize;

use crate::AbiClassification;
use crate::AbiSet;
use crate::LibraryEntry;
use crate::StaticLibraryEntry;
use crate::dex::DexClassSummary;
use crate::metadata::Component;
use crate::metadata::PackageSummary;
use crate::metadata::Provenance;

/// Everything the engine derived about one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    /// Package identifier, from the registry or the manifest.
    pub package: Option<String>,
    /// Base archive path.
    pub path: PathBuf,
    /// Number of split archives.
    pub splits: usize,
    /// Live metadata was unavailable.
    pub frozen: bool,
    /// Inspected as a loose archive.
    pub standalone: bool,
    /// Manifest identity and SDK levels.
    pub summary: PackageSummary,
    /// Final ABI verdict.
    pub abi: AbiClassification,
    /// Every architecture present, regardless of device support.
    pub abi_set: AbiSet,
    /// Native libraries for the chosen ABI.
    pub native_libraries: Vec<LibraryEntry>,
    /// Static shared-library dependencies.
    pub static_libraries: Vec<StaticLibraryEntry>,
    /// Folded third-party class summary.
    pub classes: DexClassSummary,
    /// Application metadata (value in `source`).
    pub metadata: Vec<LibraryEntry>,
    /// Requested permissions.
    pub permissions: Vec<LibraryEntry>,
    /// Declared components.
    pub components: Vec<Component>,
    /// Build tooling signals.
    pub provenance: Provenance,
}

impl PackageReport {
    /// Total size of the listed native libraries, in bytes.
    #[must_use]
    pub fn native_size(&self) -> u64 {
        self.native_libraries.iter().map(|lib| lib.size).sum()
    }
}
