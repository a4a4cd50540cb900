//! Instruction-set classification types.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

/// One ABI value: a concrete instruction set or a sentinel state.
///
/// The sentinels (`NoLibraries`, `Overlay`, `Error`) share the enum with the
/// architectures so that a single classification always holds exactly one
/// base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Abi {
    /// `armeabi`
    Armv5,
    /// `armeabi-v7a`
    Armv7,
    /// `arm64-v8a`
    Armv8,
    /// `x86`
    X86,
    /// `x86_64`
    #[serde(rename = "x86_64")]
    X86_64,
    /// The package ships no native code.
    NoLibraries,
    /// The package is a resource overlay.
    Overlay,
    /// No ABI could be determined.
    Error,
}

impl Abi {
    /// Concrete architectures in ranking order, most preferred first.
    pub const PRECEDENCE: [Self; 5] = [
        Self::Armv8,
        Self::Armv7,
        Self::Armv5,
        Self::X86_64,
        Self::X86,
    ];

    /// Parses an ABI directory name as it appears under `lib/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use apkscope_core::Abi;
    ///
    /// assert_eq!(Abi::from_dir_name("arm64-v8a"), Some(Abi::Armv8));
    /// assert_eq!(Abi::from_dir_name("mips"), None);
    /// ```
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "armeabi" => Some(Self::Armv5),
            "armeabi-v7a" => Some(Self::Armv7),
            "arm64-v8a" => Some(Self::Armv8),
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X86_64),
            _ => None,
        }
    }

    /// Parses an instruction-set directory name from an installed
    /// native-library directory (`arm64`, `arm`, `x86_64`, `x86`).
    #[must_use]
    pub fn from_isa_dir(name: &str) -> Option<Self> {
        match name {
            "arm64" => Some(Self::Armv8),
            "arm" => Some(Self::Armv7),
            "x86_64" => Some(Self::X86_64),
            "x86" => Some(Self::X86),
            _ => None,
        }
    }

    /// Returns the `lib/` directory name for a concrete architecture.
    #[must_use]
    pub const fn dir_name(self) -> Option<&'static str> {
        match self {
            Self::Armv5 => Some("armeabi"),
            Self::Armv7 => Some("armeabi-v7a"),
            Self::Armv8 => Some("arm64-v8a"),
            Self::X86 => Some("x86"),
            Self::X86_64 => Some("x86_64"),
            Self::NoLibraries | Self::Overlay | Self::Error => None,
        }
    }

    /// Returns the installed native-library subdirectory for this
    /// architecture. Both 32-bit ARM variants share `arm`.
    #[must_use]
    pub const fn isa_dir_name(self) -> Option<&'static str> {
        match self {
            Self::Armv5 | Self::Armv7 => Some("arm"),
            Self::Armv8 => Some("arm64"),
            Self::X86 => Some("x86"),
            Self::X86_64 => Some("x86_64"),
            Self::NoLibraries | Self::Overlay | Self::Error => None,
        }
    }

    /// Returns `true` for a concrete instruction set.
    #[must_use]
    pub const fn is_architecture(self) -> bool {
        !self.is_sentinel()
    }

    /// Returns `true` for `NoLibraries`, `Overlay` and `Error`.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::NoLibraries | Self::Overlay | Self::Error)
    }

    /// Returns `true` for 64-bit instruction sets.
    #[must_use]
    pub const fn is_64_bit(self) -> bool {
        matches!(self, Self::Armv8 | Self::X86_64)
    }

    /// Position in [`Abi::PRECEDENCE`]; sentinels rank last.
    #[must_use]
    pub fn rank(self) -> usize {
        Self::PRECEDENCE
            .iter()
            .position(|abi| *abi == self)
            .unwrap_or(Self::PRECEDENCE.len())
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dir_name() {
            Some(name) => f.write_str(name),
            None => match self {
                Self::NoLibraries => f.write_str("no-libraries"),
                Self::Overlay => f.write_str("overlay"),
                _ => f.write_str("error"),
            },
        }
    }
}

impl std::str::FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dir_name(s)
            .or_else(|| Self::from_isa_dir(s))
            .or_else(|| match s {
                "armv5" => Some(Self::Armv5),
                "armv7" => Some(Self::Armv7),
                "armv8" => Some(Self::Armv8),
                _ => None,
            })
            .ok_or_else(|| format!("unknown ABI: {s}"))
    }
}

/// Final ABI verdict for a package.
///
/// `multi_arch` is a modifier on top of `abi`, never a replacement for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbiClassification {
    /// Base classification.
    pub abi: Abi,
    /// The package declares it runs on several architectures at once.
    pub multi_arch: bool,
}

impl AbiClassification {
    /// Creates a classification without the multi-architecture modifier.
    #[must_use]
    pub const fn new(abi: Abi) -> Self {
        Self {
            abi,
            multi_arch: false,
        }
    }

    /// Adds the multi-architecture modifier.
    #[must_use]
    pub const fn with_multi_arch(mut self, multi_arch: bool) -> Self {
        self.multi_arch = multi_arch;
        self
    }
}

impl fmt::Display for AbiClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multi_arch {
            write!(f, "{} (multi-arch)", self.abi)
        } else {
            write!(f, "{}", self.abi)
        }
    }
}

/// Architectures physically present in an archive.
///
/// Holds at most one entry per instruction set. A set holding a sentinel
/// holds nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AbiSet {
    abis: SmallVec<[Abi; 5]>,
}

impl AbiSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding only `sentinel`.
    #[must_use]
    pub fn sentinel(sentinel: Abi) -> Self {
        let mut abis = SmallVec::new();
        abis.push(sentinel);
        Self { abis }
    }

    /// Adds an architecture. Returns `false` if it was already present.
    pub fn insert(&mut self, abi: Abi) -> bool {
        if self.abis.contains(&abi) {
            return false;
        }
        self.abis.push(abi);
        true
    }

    /// Returns `true` if `abi` is present.
    #[must_use]
    pub fn contains(&self, abi: Abi) -> bool {
        self.abis.contains(&abi)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.abis.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abis.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.abis.clear();
    }

    /// Iterates entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = Abi> + '_ {
        self.abis.iter().copied()
    }

    /// Returns the sentinel this set stands for, if any.
    #[must_use]
    pub fn as_sentinel(&self) -> Option<Abi> {
        match self.abis.as_slice() {
            [abi] if abi.is_sentinel() => Some(*abi),
            _ => None,
        }
    }

    /// Concrete architectures sorted by [`Abi::PRECEDENCE`].
    #[must_use]
    pub fn ranked(&self) -> Vec<Abi> {
        let mut ranked: Vec<Abi> = self.iter().filter(|abi| abi.is_architecture()).collect();
        ranked.sort_by_key(|abi| abi.rank());
        ranked
    }
}

impl FromIterator<Abi> for AbiSet {
    fn from_iter<I: IntoIterator<Item = Abi>>(iter: I) -> Self {
        let mut set = Self::new();
        for abi in iter {
            set.insert(abi);
        }
        set
    }
}

impl fmt::Display for AbiSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|abi| abi.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
