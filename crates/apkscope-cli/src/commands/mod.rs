//! Command implementations.

pub mod abi;
pub mod classes;
pub mod completion;
pub mod has_class;
pub mod inspect;
pub mod list;

use crate::cli::EngineArgs;
use crate::error::add_target_context;
use anyhow::Result;
use apkscope_core::ApkArchive;
use apkscope_core::DeviceProfile;
use apkscope_core::InspectConfig;
use apkscope_core::PackageHandle;
use std::path::Path;

/// Loads `--config` or falls back to the defaults.
pub fn load_config(engine: &EngineArgs) -> Result<InspectConfig> {
    match &engine.config {
        Some(path) => add_target_context(InspectConfig::load(path), &path.display().to_string()),
        None => Ok(InspectConfig::default()),
    }
}

/// Device described by `--device-abi`, or the host machine.
pub fn device_profile(engine: &EngineArgs) -> DeviceProfile {
    if engine.device_abi.is_empty() {
        DeviceProfile::host()
    } else {
        DeviceProfile::new(engine.device_abi.clone())
    }
}

/// Checks that `path` is a readable APK and wraps it as a loose archive.
pub fn open_standalone(path: &Path) -> Result<PackageHandle> {
    add_target_context(ApkArchive::open(path), &path.display().to_string())?;
    Ok(PackageHandle::standalone(path))
}
