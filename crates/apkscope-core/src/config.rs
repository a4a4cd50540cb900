//! Inspection configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::InspectError;
use crate::Result;

/// Tunables for one inspection engine.
///
/// # Examples
///
/// ```
/// use apkscope_core::InspectConfig;
///
/// // Use defaults
/// let config = InspectConfig::default();
/// assert_eq!(config.max_dex_containers, 5);
///
/// // Or load overrides from TOML
/// let custom = InspectConfig::from_toml_str("max_dex_containers = 2").unwrap();
/// assert_eq!(custom.max_dex_containers, 2);
/// assert_eq!(custom.max_abi_entries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Maximum number of DEX containers opened per package.
    pub max_dex_containers: usize,

    /// Distinct architectures after which an ABI scan stops.
    pub max_abi_entries: usize,

    /// Three-segment package paths that never absorb their children when
    /// class names are folded.
    pub deep_hierarchy_exceptions: Vec<String>,

    /// Registry enumeration retry policy.
    pub retry: RetryPolicy,

    /// Capacity of the per-engine package metadata cache.
    pub cache_capacity: usize,

    /// Largest uncompressed size, in bytes, read from any single entry.
    pub max_entry_size: u64,
}

impl Default for InspectConfig {
    /// Default values:
    /// - `max_dex_containers`: 5
    /// - `max_abi_entries`: 5
    /// - `deep_hierarchy_exceptions`: [`DEFAULT_DEEP_HIERARCHY_EXCEPTIONS`]
    /// - `retry`: [`RetryPolicy::default`]
    /// - `cache_capacity`: 256
    /// - `max_entry_size`: [`DEFAULT_MAX_ENTRY_SIZE`] (256 MiB)
    fn default() -> Self {
        Self {
            max_dex_containers: 5,
            max_abi_entries: 5,
            deep_hierarchy_exceptions: DEFAULT_DEEP_HIERARCHY_EXCEPTIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            retry: RetryPolicy::default(),
            cache_capacity: 256,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

/// Default per-entry read limit.
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// Vendors whose SDKs live side by side under one shared three-segment
/// namespace.
pub const DEFAULT_DEEP_HIERARCHY_EXCEPTIONS: &[&str] = &[
    "com.google.android",
    "com.google.firebase",
    "com.google.mlkit",
    "com.tencent.mm",
    "com.tencent.tauth",
    "com.alibaba.android",
    "com.huawei.hms",
    "com.facebook.react",
    "com.microsoft.appcenter",
    "com.amazonaws.mobileconnectors",
];

impl InspectConfig {
    /// Parses a configuration from TOML text; missing keys keep defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| InspectError::Config(e.to_string()))
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Returns `true` if `path` is on the deep-hierarchy exception list.
    #[must_use]
    pub fn is_deep_hierarchy(&self, path: &str) -> bool {
        self.deep_hierarchy_exceptions.iter().any(|p| p == path)
    }
}

/// Bounded exponential backoff for registry enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `0` behaves like `1`.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits; useful for tests and one-shot CLIs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InspectConfig::default();
        assert_eq!(config.max_dex_containers, 5);
        assert_eq!(config.max_abi_entries, 5);
        assert!(config.is_deep_hierarchy("com.google.android"));
        assert!(!config.is_deep_hierarchy("com.squareup.okhttp3"));
        assert_eq!(config.max_entry_size, DEFAULT_MAX_ENTRY_SIZE);
    }

    #[test]
    fn test_entry_size_override() {
        let config = InspectConfig::from_toml_str("max_entry_size = 4096").unwrap();
        assert_eq!(config.max_entry_size, 4096);
        assert_eq!(config.max_dex_containers, 5);
    }

    #[test]
    fn test_toml_overrides() {
        let config = InspectConfig::from_toml_str(
            r#"
            deep_hierarchy_exceptions = ["org.example.sdk"]

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.deep_hierarchy_exceptions, vec!["org.example.sdk"]);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_delay_ms, 200);
    }

    #[test]
    fn test_invalid_toml() {
        let result = InspectConfig::from_toml_str("max_dex_containers = \"many\"");
        assert!(matches!(result, Err(InspectError::Config(_))));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(8), Duration::from_millis(1_000));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_after(2), Duration::ZERO);
    }
}
