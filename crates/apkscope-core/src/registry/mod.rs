//! Collaborator interfaces: the live package registry and its records.
//!
//! The engine never reaches into platform objects directly. Everything it
//! needs from the live system goes through [`PackageRegistry`], which a
//! platform integration implements once.

pub mod cache;
pub mod directory;
pub mod retry;

use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::Result;

pub use cache::PackageCache;
pub use directory::DirectoryRegistry;
pub use retry::list_installed_packages;

/// What the registry knows about one installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package identifier.
    pub id: String,
    /// Path of the base archive.
    pub source_dir: PathBuf,
    /// Split archive paths reported by the live registry.
    pub split_source_dirs: Vec<PathBuf>,
    /// Installed native-library directory, if any.
    pub native_library_dir: Option<PathBuf>,
    /// Primary ABI chosen by the installer, if exposed.
    pub primary_cpu_abi: Option<String>,
    /// Whether the package is a resource overlay.
    pub is_overlay: bool,
    /// Whether the package is disabled and its live metadata unreliable.
    pub frozen: bool,
    /// Registered shared-library files.
    pub shared_library_files: Vec<String>,
    /// Requested permissions, when the registry exposes them.
    pub requested_permissions: Option<Vec<String>>,
    /// Application metadata, when the registry exposes it.
    pub metadata: Option<Vec<(String, String)>>,
}

impl PackageRecord {
    /// Creates a record with only an id and a base archive path.
    #[must_use]
    pub fn new(id: impl Into<String>, source_dir: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            source_dir: source_dir.as_ref().to_path_buf(),
            split_source_dirs: Vec::new(),
            native_library_dir: None,
            primary_cpu_abi: None,
            is_overlay: false,
            frozen: false,
            shared_library_files: Vec::new(),
            requested_permissions: None,
            metadata: None,
        }
    }
}

/// Enabled setting a registry reports for one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnabledSetting {
    /// No override; the manifest default applies.
    Default,
    /// Explicitly enabled.
    Enabled,
    /// Explicitly disabled.
    Disabled,
    /// Disabled by the user.
    DisabledUser,
    /// Disabled until first use.
    DisabledUntilUsed,
}

/// Source of installed-package state.
pub trait PackageRegistry {
    /// Looks up one package.
    ///
    /// # Errors
    ///
    /// Returns `PackageNotFound` if no such package is installed.
    fn package(&self, id: &str) -> Result<PackageRecord>;

    /// Enumerates every installed package.
    fn installed_packages(&self) -> Result<Vec<PackageRecord>>;

    /// Reports the enabled setting of one component.
    fn component_enabled_setting(&self, package: &str, component: &str)
    -> Result<EnabledSetting>;
}

/// Resolves numeric resource IDs to names.
pub trait ResourceResolver {
    /// Returns a name such as `string/app_name`, or `None` if unknown.
    fn resource_name(&self, id: u32) -> Option<String>;
}

/// Resolver that knows no resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn resource_name(&self, _id: u32) -> Option<String> {
        None
    }
}
