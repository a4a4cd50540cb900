//! Bounded retry around registry enumeration.

use tracing::warn;

use crate::InspectError;
use crate::Result;
use crate::config::RetryPolicy;
use crate::registry::PackageRecord;
use crate::registry::PackageRegistry;

/// Enumerates installed packages, retrying transient failures.
///
/// Waits [`RetryPolicy::delay_after`] between attempts and gives up after
/// `max_attempts`.
///
/// # Errors
///
/// Returns `RegistryUnavailable` once every attempt has failed.
pub fn list_installed_packages<R: PackageRegistry + ?Sized>(
    registry: &R,
    policy: &RetryPolicy,
) -> Result<Vec<PackageRecord>> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match registry.installed_packages() {
            Ok(packages) => return Ok(packages),
            Err(e) => {
                warn!(attempt, max_attempts = attempts, error = %e, "package enumeration failed");
                if attempt < attempts {
                    std::thread::sleep(policy.delay_after(attempt));
                }
            }
        }
    }
    Err(InspectError::RegistryUnavailable { attempts })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::EnabledSetting;
    use std::cell::Cell;

    struct FlakyRegistry {
        failures: u32,
        calls: Cell<u32>,
    }

    impl PackageRegistry for FlakyRegistry {
        fn package(&self, id: &str) -> Result<PackageRecord> {
            Err(InspectError::PackageNotFound { id: id.into() })
        }

        fn installed_packages(&self) -> Result<Vec<PackageRecord>> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call <= self.failures {
                return Err(std::io::Error::other("binder died").into());
            }
            Ok(vec![PackageRecord::new("com.a", "/a.apk")])
        }

        fn component_enabled_setting(&self, _: &str, _: &str) -> Result<EnabledSetting> {
            Ok(EnabledSetting::Default)
        }
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let registry = FlakyRegistry {
            failures: 2,
            calls: Cell::new(0),
        };
        let packages = list_installed_packages(&registry, &RetryPolicy::immediate(3)).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(registry.calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_bound() {
        let registry = FlakyRegistry {
            failures: u32::MAX,
            calls: Cell::new(0),
        };
        let result = list_installed_packages(&registry, &RetryPolicy::immediate(4));
        assert!(matches!(
            result,
            Err(InspectError::RegistryUnavailable { attempts: 4 })
        ));
        assert_eq!(registry.calls.get(), 4);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let registry = FlakyRegistry {
            failures: 0,
            calls: Cell::new(0),
        };
        assert!(list_installed_packages(&registry, &RetryPolicy::immediate(0)).is_ok());
        assert_eq!(registry.calls.get(), 1);
    }
}
