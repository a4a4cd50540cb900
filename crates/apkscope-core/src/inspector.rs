//! Package inspection facade.
//!
//! Resolves a package id or a loose archive to a [`PackageHandle`], runs
//! every component against it and assembles a [`PackageReport`]. The
//! components never talk to each other; they only share the handle.

use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::Abi;
use crate::ApkArchive;
use crate::DeviceProfile;
use crate::InspectConfig;
use crate::PackageHandle;
use crate::Result;
use crate::abi::AbiHints;
use crate::abi::AbiResolver;
use crate::abi::ScanOptions;
use crate::abi::native_libraries;
use crate::archive::resolve_handle;
use crate::dex;
use crate::dex::DexLimits;
use crate::metadata;
use crate::metadata::Provenance;
use crate::registry::PackageCache;
use crate::registry::PackageRecord;
use crate::registry::PackageRegistry;
use crate::registry::list_installed_packages;
use crate::report::PackageReport;
use crate::resources::ResourceTable;
use crate::static_libs::resolve_static_libraries;

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    /// Architecture to report instead of the resolved one.
    pub abi_override: Option<Abi>,
    /// Report architectures the device cannot run in `abi_set`.
    pub ignore_device_filter: bool,
}

/// Inspection engine bound to one device and configuration.
///
/// # Examples
///
/// ```no_run
/// use apkscope_core::DeviceProfile;
/// use apkscope_core::InspectConfig;
/// use apkscope_core::InspectOptions;
/// use apkscope_core::Inspector;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let inspector = Inspector::new(InspectConfig::default(), DeviceProfile::host());
/// let report = inspector.inspect_archive("app.apk", InspectOptions::default())?;
/// println!("{}: {}", report.path.display(), report.abi);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Inspector {
    config: InspectConfig,
    device: DeviceProfile,
    cache: PackageCache,
}

impl Inspector {
    /// Creates an engine with an empty package cache.
    #[must_use]
    pub fn new(config: InspectConfig, device: DeviceProfile) -> Self {
        let cache = PackageCache::new(config.cache_capacity);
        Self {
            config,
            device,
            cache,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    /// Device the engine resolves ABIs against.
    #[must_use]
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// Package record cache. Callers decide when to invalidate it.
    #[must_use]
    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Enumerates installed packages with bounded retry and refreshes the
    /// cache from the result.
    ///
    /// # Errors
    ///
    /// Returns `RegistryUnavailable` once the retry policy is exhausted.
    pub fn list_packages(&self, registry: &dyn PackageRegistry) -> Result<Vec<PackageRecord>> {
        let records = list_installed_packages(registry, &self.config.retry)?;
        self.cache.extend(records.iter().cloned());
        Ok(records)
    }

    /// Inspects an installed package.
    ///
    /// # Errors
    ///
    /// Returns `PackageNotFound` if the registry does not know `id` and
    /// `NoArchive` if its base archive is gone. Damage inside the archive
    /// only empties the affected report fields.
    pub fn inspect_package(
        &self,
        registry: &dyn PackageRegistry,
        id: &str,
        options: InspectOptions,
    ) -> Result<PackageReport> {
        let record = self.cache.lookup(registry, id)?;
        let handle = resolve_handle(&record)?;
        Ok(self.assemble(&handle, Some(&record), Some(registry), options))
    }

    /// Inspects an APK file that is not installed.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `InvalidArchive` if the file is not a readable ZIP.
    pub fn inspect_archive<P: AsRef<Path>>(
        &self,
        path: P,
        options: InspectOptions,
    ) -> Result<PackageReport> {
        let path = path.as_ref();
        drop(ApkArchive::open(path)?);
        let handle = PackageHandle::standalone(path);
        Ok(self.assemble(&handle, None, None, options))
    }

    /// Runs every component against `handle`.
    pub fn assemble(
        &self,
        handle: &PackageHandle,
        record: Option<&PackageRecord>,
        registry: Option<&dyn PackageRegistry>,
        options: InspectOptions,
    ) -> PackageReport {
        let summary = metadata::summary(handle);
        let package = record
            .map(|r| r.id.clone())
            .or_else(|| summary.package.clone());
        debug!(package = ?package, archive = %handle.base().display(), "inspecting");

        let mut hints = record
            .map(AbiHints::from_record)
            .unwrap_or_default()
            .with_override(options.abi_override);
        hints.is_overlay |= summary.is_overlay;

        let resolver = AbiResolver::new(&self.device, &self.config);
        let present = resolver.resolve_abi_set(
            handle,
            ScanOptions {
                is_overlay: hints.is_overlay,
                ignore_device_filter: true,
            },
        );
        let abi_set = if options.ignore_device_filter {
            present.clone()
        } else {
            resolver.resolve_abi_set(
                handle,
                ScanOptions {
                    is_overlay: hints.is_overlay,
                    ignore_device_filter: false,
                },
            )
        };
        let abi = resolver.resolve_abi(handle, &hints, Some(&present));

        let shared_library_files = record.map_or(&[][..], |r| r.shared_library_files.as_slice());
        let static_libraries = resolve_static_libraries(handle, shared_library_files);

        let scan = dex::scan_classes(
            handle,
            package.as_deref(),
            DexLimits::from(&self.config),
            &self.config.deep_hierarchy_exceptions,
        );

        let resources = ResourceTable::from_handle(handle).unwrap_or_else(|e| {
            debug!(error = %e, "no resource table");
            ResourceTable::default()
        });
        let metadata = metadata::application_metadata(handle, record, &resources);
        let permissions = metadata::permissions(handle, record);
        let components =
            metadata::components(handle, package.as_deref().unwrap_or_default(), registry);
        let provenance =
            Provenance::probe(handle, scan.saw_runtime, DexLimits::from(&self.config));

        info!(
            package = ?package,
            abi = %abi,
            classes = scan.summary.len(),
            dex_containers = scan.containers,
            "inspection complete"
        );

        PackageReport {
            package,
            path: handle.base().to_path_buf(),
            splits: handle.splits().len(),
            frozen: handle.is_frozen(),
            standalone: handle.is_standalone(),
            summary,
            native_libraries: native_libraries(handle, abi.abi),
            abi,
            abi_set,
            static_libraries,
            classes: scan.summary,
            metadata,
            permissions,
            components,
            provenance,
        }
    }
}
