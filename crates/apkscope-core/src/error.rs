//! Error types for package inspection.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `InspectError`.
pub type Result<T> = std::result::Result<T, InspectError>;

/// Errors that can occur while inspecting a package.
///
/// Most component entry points never surface these: a missing or corrupt
/// archive degrades to "no data" for the package under inspection. The
/// variants are still typed so that lower-level readers can report exactly
/// what went wrong and callers that want the detail can get it.
#[derive(Error, Debug)]
pub enum InspectError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a readable ZIP container.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// A required entry is absent from the archive.
    #[error("entry not found in archive: {name}")]
    MissingEntry {
        /// Entry name that was looked up.
        name: String,
    },

    /// An entry inflates past the configured read limit.
    #[error("entry {name} exceeds the {limit} byte read limit")]
    EntryTooLarge {
        /// Entry name.
        name: String,
        /// Limit in bytes.
        limit: u64,
    },

    /// Binary manifest could not be decoded.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// DEX container could not be decoded.
    #[error("malformed dex: {0}")]
    MalformedDex(String),

    /// Resource table could not be decoded.
    #[error("malformed resource table: {0}")]
    MalformedResources(String),

    /// The registry has no package with this identifier.
    #[error("package not found: {id}")]
    PackageNotFound {
        /// Package identifier that was requested.
        id: String,
    },

    /// The package resolved to no archive on disk.
    #[error("no archive found for package at {path}")]
    NoArchive {
        /// Source path that was probed.
        path: PathBuf,
    },

    /// Registry enumeration kept failing until the retry bound was hit.
    #[error("package registry unavailable after {attempts} attempts")]
    RegistryUnavailable {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl InspectError {
    /// Returns `true` if the error means the archive itself is unusable.
    ///
    /// Scanning components turn these into empty results instead of
    /// propagating them.
    ///
    /// # Examples
    ///
    /// ```
    /// use apkscope_core::InspectError;
    ///
    /// let err = InspectError::InvalidArchive("bad central directory".to_string());
    /// assert!(err.is_archive_unavailable());
    ///
    /// let err = InspectError::RegistryUnavailable { attempts: 3 };
    /// assert!(!err.is_archive_unavailable());
    /// ```
    #[must_use]
    pub const fn is_archive_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::InvalidArchive(_) | Self::NoArchive { .. }
        )
    }

    /// Returns `true` if the error came from decoding one embedded file.
    ///
    /// These are partial failures: the rest of the archive is still usable.
    #[must_use]
    pub const fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedManifest(_)
                | Self::MalformedDex(_)
                | Self::MalformedResources(_)
                | Self::MissingEntry { .. }
                | Self::EntryTooLarge { .. }
        )
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use apkscope_core::InspectError;
    ///
    /// let err = InspectError::MalformedDex("bad magic".to_string());
    /// assert_eq!(err.context(), Some("bad magic"));
    ///
    /// let err = InspectError::RegistryUnavailable { attempts: 2 };
    /// assert_eq!(err.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg)
            | Self::MalformedManifest(msg)
            | Self::MalformedDex(msg)
            | Self::MalformedResources(msg)
            | Self::Config(msg) => Some(msg),
            _ => None,
        }
    }
}
