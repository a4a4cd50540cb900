//! Application metadata, permissions, components and package summary.
//!
//! Live registry data is preferred where the registry exposes it; frozen
//! and standalone packages fall back to the manifest inside the archive.
//! Every reader here degrades to an empty result rather than failing.

pub mod provenance;

use serde::Serialize;
use tracing::debug;

use crate::ApkArchive;
use crate::LibraryEntry;
use crate::PackageHandle;
use crate::Result;
use crate::manifest;
use crate::manifest::Element;
use crate::registry::EnabledSetting;
use crate::registry::PackageRecord;
use crate::registry::PackageRegistry;
use crate::registry::ResourceResolver;
use crate::types::library::dedup_by_name;

pub use provenance::Provenance;

/// Interprets a metadata value as an app resource ID.
///
/// Matches purely numeric values whose package byte is `0x7F` and whose
/// type byte is non-zero. False positives are expected: callers must fall
/// back to the raw value when the lookup fails.
///
/// # Examples
///
/// ```
/// use apkscope_core::metadata::resource_id;
///
/// assert_eq!(resource_id("2130837687"), Some(0x7F02_00B7));
/// assert_eq!(resource_id("2130706432"), None); // 0x7F000000
/// assert_eq!(resource_id("hello"), None);
/// ```
#[must_use]
pub fn resource_id(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: u32 = value.parse().ok()?;
    (id >> 24 == 0x7F && (id >> 16) & 0xFF >= 0x01).then_some(id)
}

/// Replaces a resource-ID-looking value with its resource name.
///
/// # Examples
///
/// ```
/// use apkscope_core::metadata::resolve_value;
/// use apkscope_core::registry::NoResources;
///
/// assert_eq!(resolve_value("2130837687", &NoResources), "2130837687");
/// ```
#[must_use]
pub fn resolve_value(value: &str, resolver: &dyn ResourceResolver) -> String {
    resource_id(value)
        .and_then(|id| resolver.resource_name(id))
        .unwrap_or_else(|| value.to_string())
}

fn walk_manifest<F>(handle: &PackageHandle, visit: F) -> Result<()>
where
    F: FnMut(&Element) -> bool,
{
    let mut archive = ApkArchive::open(handle.base())?;
    manifest::walk_archive(&mut archive, visit)
}

/// Application `<meta-data>` pairs as entries named by key, with the
/// (possibly resolved) value in `source`.
pub fn application_metadata(
    handle: &PackageHandle,
    record: Option<&PackageRecord>,
    resolver: &dyn ResourceResolver,
) -> Vec<LibraryEntry> {
    let pairs = match record.and_then(|r| r.metadata.clone()) {
        Some(pairs) => pairs,
        None => manifest_metadata(handle).unwrap_or_else(|e| {
            debug!(archive = %handle.base().display(), error = %e, "no metadata");
            Vec::new()
        }),
    };

    let mut entries: Vec<LibraryEntry> = pairs
        .into_iter()
        .map(|(key, value)| {
            let resolved = resolve_value(&value, resolver);
            LibraryEntry::new(key, 0).with_source(resolved)
        })
        .collect();
    dedup_by_name(&mut entries);
    entries
}

fn manifest_metadata(handle: &PackageHandle) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    walk_manifest(handle, |element| {
        // Only application-level metadata; components carry their own.
        if element.name == "meta-data"
            && element.depth == 2
            && let Some(name) = element.attr_str("name")
        {
            let value = element
                .attr("value")
                .or_else(|| element.attr("resource"))
                .map(ToString::to_string)
                .unwrap_or_default();
            pairs.push((name.to_string(), value));
        }
        true
    })?;
    Ok(pairs)
}

/// Requested permission names, verbatim, in declaration order.
pub fn permissions(handle: &PackageHandle, record: Option<&PackageRecord>) -> Vec<LibraryEntry> {
    let names = match record.and_then(|r| r.requested_permissions.clone()) {
        Some(names) => names,
        None => {
            let mut names = Vec::new();
            let walked = walk_manifest(handle, |element| {
                if matches!(element.name.as_str(), "uses-permission" | "uses-permission-sdk-23")
                    && let Some(name) = element.attr_str("name")
                {
                    names.push(name.to_string());
                }
                true
            });
            if let Err(e) = walked {
                debug!(archive = %handle.base().display(), error = %e, "no permissions");
            }
            names
        }
    };

    let mut entries: Vec<LibraryEntry> = names.into_iter().map(|n| LibraryEntry::new(n, 0)).collect();
    dedup_by_name(&mut entries);
    entries
}

/// Kind of application component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// `<activity>` or `<activity-alias>`
    Activity,
    /// `<service>`
    Service,
    /// `<receiver>`
    Receiver,
    /// `<provider>`
    Provider,
}

impl ComponentKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "activity" | "activity-alias" => Some(Self::Activity),
            "service" => Some(Self::Service),
            "receiver" => Some(Self::Receiver),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }
}

/// Effective enabled state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnabledState {
    /// The component runs.
    Enabled,
    /// The component is disabled.
    Disabled,
    /// The state could not be determined.
    Default,
}

impl EnabledState {
    /// Folds a registry setting with the manifest default.
    #[must_use]
    pub fn effective(setting: EnabledSetting, manifest_default: bool) -> Self {
        match setting {
            EnabledSetting::Disabled
            | EnabledSetting::DisabledUser
            | EnabledSetting::DisabledUntilUsed => Self::Disabled,
            EnabledSetting::Enabled => Self::Enabled,
            EnabledSetting::Default if manifest_default => Self::Enabled,
            EnabledSetting::Default => Self::Disabled,
        }
    }
}

/// One declared component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Fully qualified class name.
    pub name: String,
    /// Component kind.
    pub kind: ComponentKind,
    /// Effective enabled state.
    pub state: EnabledState,
}

/// Expands `.Main` and `Main` against the package name.
fn qualify(package: &str, name: &str) -> String {
    if name.starts_with('.') {
        format!("{package}{name}")
    } else if !name.contains('.') && !package.is_empty() {
        format!("{package}.{name}")
    } else {
        name.to_string()
    }
}

/// Declared components with their effective enabled state.
///
/// `registry` is consulted per component when present; a failed lookup
/// yields [`EnabledState::Default`]. Without a registry the manifest's own
/// `enabled` attribute decides.
pub fn components(
    handle: &PackageHandle,
    package: &str,
    registry: Option<&dyn PackageRegistry>,
) -> Vec<Component> {
    let mut declared: Vec<(String, ComponentKind, bool)> = Vec::new();
    let mut manifest_package = String::new();
    let walked = walk_manifest(handle, |element| {
        if element.depth == 0 {
            manifest_package = element.attr_str("package").unwrap_or_default().to_string();
        }
        if element.depth == 2
            && let Some(kind) = ComponentKind::from_tag(&element.name)
            && let Some(name) = element.attr_str("name")
        {
            let enabled = element.attr("enabled").and_then(|v| v.as_bool()).unwrap_or(true);
            declared.push((name.to_string(), kind, enabled));
        }
        true
    });
    if let Err(e) = walked {
        debug!(archive = %handle.base().display(), error = %e, "no components");
        return Vec::new();
    }

    let base = if manifest_package.is_empty() {
        package
    } else {
        manifest_package.as_str()
    };
    let mut components: Vec<Component> = declared
        .into_iter()
        .map(|(name, kind, manifest_default)| {
            let name = qualify(base, &name);
            let state = match registry {
                Some(registry) => match registry.component_enabled_setting(package, &name) {
                    Ok(setting) => EnabledState::effective(setting, manifest_default),
                    Err(e) => {
                        debug!(component = %name, error = %e, "enabled state unavailable");
                        EnabledState::Default
                    }
                },
                None => EnabledState::effective(EnabledSetting::Default, manifest_default),
            };
            Component { name, kind, state }
        })
        .collect();
    components.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    components.dedup_by(|a, b| a.kind == b.kind && a.name == b.name);
    components
}

/// Identity and SDK levels declared by the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    /// Manifest package name.
    pub package: Option<String>,
    /// `versionName`
    pub version_name: Option<String>,
    /// `versionCode`
    pub version_code: Option<i64>,
    /// `minSdkVersion`
    pub min_sdk: Option<i64>,
    /// `targetSdkVersion`
    pub target_sdk: Option<i64>,
    /// The manifest declares an `<overlay>` target.
    pub is_overlay: bool,
}

/// Reads the [`PackageSummary`] of the base archive.
pub fn summary(handle: &PackageHandle) -> PackageSummary {
    let mut summary = PackageSummary::default();
    let walked = walk_manifest(handle, |element| {
        match (element.depth, element.name.as_str()) {
            (0, "manifest") => {
                summary.package = element.attr_str("package").map(ToString::to_string);
                summary.version_name = element.attr("versionName").map(ToString::to_string);
                summary.version_code = element.attr("versionCode").and_then(|v| v.as_int());
            }
            (1, "uses-sdk") => {
                summary.min_sdk = element.attr("minSdkVersion").and_then(|v| v.as_int());
                summary.target_sdk = element.attr("targetSdkVersion").and_then(|v| v.as_int());
            }
            (1, "overlay") => summary.is_overlay = true,
            _ => {}
        }
        true
    });
    if let Err(e) = walked {
        debug!(archive = %handle.base().display(), error = %e, "no manifest summary");
    }
    summary
}
