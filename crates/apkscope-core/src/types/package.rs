//! Handle describing the archives behind one inspection request.

use std::path::Path;
use std::path::PathBuf;

/// Identifies one inspected unit: a base archive plus optional splits.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHandle {
    base: PathBuf,
    splits: Vec<PathBuf>,
    frozen: bool,
    standalone: bool,
    native_library_dir: Option<PathBuf>,
}

impl PackageHandle {
    /// Handle for an installed package.
    #[must_use]
    pub fn installed(base: impl Into<PathBuf>, splits: Vec<PathBuf>, frozen: bool) -> Self {
        Self {
            base: base.into(),
            splits,
            frozen,
            standalone: false,
            native_library_dir: None,
        }
    }

    /// Handle for an APK file that is not installed anywhere.
    ///
    /// Standalone archives have no registry state, so they are treated as
    /// frozen: everything is recovered from the file itself.
    #[must_use]
    pub fn standalone(path: impl Into<PathBuf>) -> Self {
        Self {
            base: path.into(),
            splits: Vec::new(),
            frozen: true,
            standalone: true,
            native_library_dir: None,
        }
    }

    /// Sets the installed native-library directory.
    #[must_use]
    pub fn with_native_library_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.native_library_dir = dir;
        self
    }

    /// Primary archive path.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Split archive paths, in registry order.
    #[must_use]
    pub fn splits(&self) -> &[PathBuf] {
        &self.splits
    }

    /// Base followed by splits.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.base.as_path()).chain(self.splits.iter().map(PathBuf::as_path))
    }

    /// Whether live metadata is unavailable for this package.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the handle points at a loose APK file.
    #[must_use]
    pub const fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Installed native-library directory, if known.
    #[must_use]
    pub fn native_library_dir(&self) -> Option<&Path> {
        self.native_library_dir.as_deref()
    }
}
