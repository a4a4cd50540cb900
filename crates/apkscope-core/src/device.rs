//! Device capability description.

use serde::Deserialize;
use serde::Serialize;

use crate::Abi;

/// What the running device can execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Natively supported instruction sets, most preferred first.
    pub supported_abis: Vec<Abi>,
    /// Whether the device runs a 64-bit userspace.
    pub is_64_bit: bool,
}

impl DeviceProfile {
    /// Builds a profile from an explicit ABI list.
    #[must_use]
    pub fn new(supported_abis: Vec<Abi>) -> Self {
        let is_64_bit = supported_abis.iter().any(|abi| abi.is_64_bit());
        Self {
            supported_abis,
            is_64_bit,
        }
    }

    /// Profile matching the machine this binary runs on.
    #[must_use]
    pub fn host() -> Self {
        let abis = match std::env::consts::ARCH {
            "aarch64" => vec![Abi::Armv8, Abi::Armv7, Abi::Armv5],
            "arm" => vec![Abi::Armv7, Abi::Armv5],
            "x86_64" => vec![Abi::X86_64, Abi::X86],
            "x86" => vec![Abi::X86],
            _ => Vec::new(),
        };
        Self::new(abis)
    }

    /// Profile that accepts every architecture.
    #[must_use]
    pub fn universal() -> Self {
        Self::new(Abi::PRECEDENCE.to_vec())
    }

    /// Returns `true` if the device can run `abi`.
    #[must_use]
    pub fn supports(&self, abi: Abi) -> bool {
        self.supported_abis.contains(&abi)
    }
}
