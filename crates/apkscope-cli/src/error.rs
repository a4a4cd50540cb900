//! Error conversion utilities for CLI.
//!
//! Converts apkscope-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use apkscope_core::InspectError;

/// Converts `InspectError` to user-friendly anyhow error with context
pub fn convert_inspect_error(err: InspectError, target: &str) -> anyhow::Error {
    match err {
        InspectError::PackageNotFound { id } => {
            anyhow!(
                "Package not found: {id}\n\
                 HINT: Run `apkscope list --root DIR` to see the installed package ids."
            )
        }
        InspectError::NoArchive { path } => {
            anyhow!(
                "Package '{}' has no archive at '{}'\n\
                 HINT: The package may have been uninstalled or moved since it was listed.",
                target,
                path.display()
            )
        }
        InspectError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The file is not an APK or it is corrupted.",
                target,
                reason
            )
        }
        InspectError::RegistryUnavailable { attempts } => {
            anyhow!(
                "Could not enumerate packages after {attempts} attempts\n\
                 HINT: Check that the --root directory exists and is readable, \
                 or raise retry.max_attempts in the configuration file."
            )
        }
        InspectError::Config(reason) => {
            anyhow!(
                "Invalid configuration '{}': {}\n\
                 HINT: Keys are max_dex_containers, max_abi_entries, max_entry_size, \
                 deep_hierarchy_exceptions, cache_capacity and [retry].",
                target,
                reason
            )
        }
        InspectError::Io(io_err) => {
            anyhow!("I/O error while processing '{}': {}", target, io_err)
        }
        _ => anyhow::Error::from(err).context(format!("Error processing '{target}'")),
    }
}

/// Adds context to a core result about the given target
pub fn add_target_context<T>(
    result: Result<T, InspectError>,
    target: &str,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_inspect_error(e, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_package_not_found() {
        let err = InspectError::PackageNotFound {
            id: "com.example".to_string(),
        };
        let msg = format!("{:?}", convert_inspect_error(err, "com.example"));
        assert!(msg.contains("Package not found: com.example"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_no_archive() {
        let err = InspectError::NoArchive {
            path: PathBuf::from("/data/app/x/base.apk"),
        };
        let msg = format!("{:?}", convert_inspect_error(err, "com.x"));
        assert!(msg.contains("/data/app/x/base.apk"));
        assert!(msg.contains("uninstalled"));
    }

    #[test]
    fn test_convert_invalid_archive() {
        let err = InspectError::InvalidArchive("bad central directory".to_string());
        let msg = format!("{:?}", convert_inspect_error(err, "app.apk"));
        assert!(msg.contains("Invalid archive 'app.apk'"));
        assert!(msg.contains("not an APK"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let msg = format!("{:?}", convert_inspect_error(InspectError::Io(io_err), "app.apk"));
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_other_errors_keep_source() {
        let err = InspectError::MalformedDex("bad magic".to_string());
        let msg = format!("{:?}", convert_inspect_error(err, "app.apk"));
        assert!(msg.contains("Error processing 'app.apk'"));
        assert!(msg.contains("bad magic"));
    }
}
