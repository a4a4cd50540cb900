//! Android package introspection engine.
//!
//! `apkscope-core` opens an installed package (base plus split APKs) or a
//! loose APK and derives what it ships: the native libraries and
//! instruction sets it targets, its static shared-library dependencies, a
//! folded summary of the third-party classes in its DEX containers, its
//! metadata, permissions and components, and build tooling fingerprints.
//!
//! Corrupt or partially readable archives never abort an inspection: each
//! component degrades to an empty result for the affected package, and the
//! ABI resolver reports a dedicated `error` sentinel.
//!
//! # Examples
//!
//! ```no_run
//! use apkscope_core::DeviceProfile;
//! use apkscope_core::InspectConfig;
//! use apkscope_core::InspectOptions;
//! use apkscope_core::Inspector;
//! use apkscope_core::registry::DirectoryRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = DirectoryRegistry::open("/data/app")?;
//! let inspector = Inspector::new(InspectConfig::default(), DeviceProfile::host());
//! let report = inspector.inspect_package(&registry, "com.example", InspectOptions::default())?;
//! println!("{} ships {} native libraries", report.abi, report.native_libraries.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod abi;
pub mod archive;
pub mod config;
pub mod device;
pub mod dex;
pub mod error;
pub mod inspector;
pub mod manifest;
pub mod metadata;
pub mod registry;
pub mod report;
pub mod resources;
pub mod static_libs;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use archive::ApkArchive;
pub use config::InspectConfig;
pub use config::RetryPolicy;
pub use device::DeviceProfile;
pub use error::InspectError;
pub use error::Result;
pub use inspector::InspectOptions;
pub use inspector::Inspector;
pub use report::PackageReport;

// Re-export types module for easier access
pub use types::Abi;
pub use types::AbiClassification;
pub use types::AbiSet;
pub use types::LibraryEntry;
pub use types::PackageHandle;
pub use types::StaticLibraryEntry;
