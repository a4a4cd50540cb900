//! Build tooling fingerprints.

use serde::Serialize;
use tracing::debug;

use crate::ApkArchive;
use crate::PackageHandle;
use crate::archive::ArchiveSet;
use crate::dex;
use crate::dex::DexLimits;

/// Embedded files that may carry the build plugin version, in probe order,
/// each with the prefix of the line holding it.
const BUILD_PLUGIN_PROBES: &[(&str, &str)] = &[
    (
        "META-INF/com/android/build/gradle/app-metadata.properties",
        "androidGradlePluginVersion=",
    ),
    ("META-INF/MANIFEST.MF", "Created-By: Android Gradle "),
    (
        "META-INF/com/android/build/gradle/aar-metadata.properties",
        "minAndroidGradlePluginVersion=",
    ),
];

/// Files the Kotlin toolchain leaves in an APK.
pub const KOTLIN_MARKERS: &[&str] = &[
    "kotlin-tooling-metadata.json",
    "kotlin/kotlin.kotlin_builtins",
    "META-INF/kotlin-stdlib.kotlin_module",
    "META-INF/kotlinx_coroutines_core.version",
];

/// Class query that detects Jetpack Compose.
pub const COMPOSE_QUERY: &str = "androidx.compose.*";

/// Tooling signals for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Android Gradle Plugin version, if recorded.
    pub build_plugin_version: Option<String>,
    /// Kotlin was used.
    pub kotlin: bool,
    /// Jetpack Compose was used.
    pub compose: bool,
}

impl Provenance {
    /// Runs every probe against `handle`.
    ///
    /// `saw_runtime` is the Kotlin runtime flag from an earlier class scan.
    pub fn probe(handle: &PackageHandle, saw_runtime: bool, limits: DexLimits) -> Self {
        let build_plugin_version = ApkArchive::open(handle.base())
            .ok()
            .map(|archive| archive.with_max_entry_size(limits.max_entry_size))
            .and_then(|mut archive| build_plugin_version(&mut archive));
        Self {
            build_plugin_version,
            kotlin: saw_runtime || has_kotlin_markers(handle),
            compose: dex::contains_class(handle, COMPOSE_QUERY, limits),
        }
    }
}

/// Reads the build plugin version, stopping at the first probe that has it.
pub fn build_plugin_version(archive: &mut ApkArchive) -> Option<String> {
    for (entry, prefix) in BUILD_PLUGIN_PROBES {
        if !archive.contains(entry) {
            continue;
        }
        let text = match archive.read_to_string(entry) {
            Ok(text) => text,
            Err(e) => {
                debug!(entry = %entry, error = %e, "unreadable provenance file");
                continue;
            }
        };
        let version = text
            .lines()
            .find_map(|line| line.trim().strip_prefix(prefix))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(version) = version {
            return Some(version.to_string());
        }
    }
    None
}

/// Returns `true` if any archive of the package holds a Kotlin marker file.
pub fn has_kotlin_markers(handle: &PackageHandle) -> bool {
    match ArchiveSet::open(handle) {
        Ok(mut archives) => archives
            .iter_mut()
            .any(|archive| KOTLIN_MARKERS.iter().any(|marker| archive.contains(marker))),
        Err(_) => false,
    }
}
