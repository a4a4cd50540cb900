//! Hierarchical folding of class names into a library summary.
//!
//! Class names are first shortened one by one, then merged in rounds until
//! no retained path is an ancestor of another.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

/// Namespace of the Kotlin runtime.
pub const RUNTIME_NAMESPACE: &str = "kotlin";

/// Namespace of the Jetpack UI toolkit.
pub const TOOLKIT_NAMESPACE: &str = "androidx";

const TOOLKIT_DEPTH: usize = 3;
const MAX_DEPTH: usize = 4;

/// Folded package paths standing in for the classes of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DexClassSummary {
    entries: BTreeSet<String>,
}

impl DexClassSummary {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing survived filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `path` is an entry.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    /// Entries in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl FromIterator<String> for DexClassSummary {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Outcome of the per-class pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// Dropped: own package or a single-token name.
    Skipped,
    /// Dropped, but proves the Kotlin runtime is bundled.
    Runtime,
    /// Kept under this shortened path.
    Kept(String),
}

fn segments(path: &str) -> usize {
    path.split('.').count()
}

fn truncate(path: &str, depth: usize) -> &str {
    match path.match_indices('.').nth(depth - 1) {
        Some((at, _)) => &path[..at],
        None => path,
    }
}

/// Returns `true` if `ancestor` is `path` or one of its parent segments.
fn is_under(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Shortens one dotted class name.
///
/// # Examples
///
/// ```
/// use apkscope_core::dex::fold::Shortened;
/// use apkscope_core::dex::fold::shorten;
///
/// assert_eq!(
///     shorten("androidx.compose.ui.node.LayoutNode", None),
///     Shortened::Kept("androidx.compose.ui".to_string())
/// );
/// assert_eq!(shorten("a", None), Shortened::Skipped);
/// assert_eq!(shorten("kotlin.Unit", None), Shortened::Runtime);
/// ```
#[must_use]
pub fn shorten(class: &str, own_package: Option<&str>) -> Shortened {
    if own_package.is_some_and(|own| !own.is_empty() && is_under(class, own)) {
        return Shortened::Skipped;
    }
    if !class.contains('.') {
        return Shortened::Skipped;
    }
    if is_under(class, RUNTIME_NAMESPACE) {
        return Shortened::Runtime;
    }
    let depth = if is_under(class, TOOLKIT_NAMESPACE) {
        TOOLKIT_DEPTH
    } else {
        MAX_DEPTH
    };
    Shortened::Kept(truncate(class, depth).to_string())
}

/// Merges shortened paths until no retained path is an ancestor of another,
/// except where the ancestor is on `exceptions`.
///
/// Running it again over its own output changes nothing.
#[must_use]
pub fn fold(paths: BTreeSet<String>, exceptions: &[String]) -> BTreeSet<String> {
    let exempt = |path: &str| exceptions.iter().any(|e| e == path);
    let mut paths = paths;

    // Three-segment paths absorb everything below them.
    let parents: Vec<String> = paths
        .iter()
        .filter(|p| segments(p) == 3 && !exempt(p))
        .cloned()
        .collect();
    for parent in &parents {
        paths.retain(|p| p == parent || !is_under(p, parent));
    }

    // Four-segment siblings collapse into their common parent.
    let mut siblings: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths.iter().filter(|p| segments(p) == 4) {
        let parent = truncate(path, 3);
        if !exempt(parent) {
            siblings.entry(parent.to_string()).or_default().push(path.clone());
        }
    }
    for (parent, children) in siblings {
        if children.len() > 1 && children.iter().any(|c| !exempt(c)) {
            for child in &children {
                paths.remove(child);
            }
            paths.insert(parent);
        }
    }

    // Paths of up to three segments, including parents added above, close
    // over whatever is still below them.
    let shallow: Vec<String> = paths
        .iter()
        .filter(|p| segments(p) <= 3 && !exempt(p))
        .cloned()
        .collect();
    for ancestor in &shallow {
        paths.retain(|p| p == ancestor || !is_under(p, ancestor));
    }

    paths
}

/// Streams class names into a [`DexClassSummary`].
#[derive(Debug, Default)]
pub struct Folder<'a> {
    own_package: Option<&'a str>,
    paths: BTreeSet<String>,
    saw_runtime: bool,
}

impl<'a> Folder<'a> {
    /// Creates a folder skipping classes under `own_package`.
    #[must_use]
    pub fn new(own_package: Option<&'a str>) -> Self {
        Self {
            own_package,
            paths: BTreeSet::new(),
            saw_runtime: false,
        }
    }

    /// Adds one class name.
    pub fn push(&mut self, class: &str) {
        match shorten(class, self.own_package) {
            Shortened::Kept(path) => {
                self.paths.insert(path);
            }
            Shortened::Runtime => self.saw_runtime = true,
            Shortened::Skipped => {}
        }
    }

    /// Returns `true` once a runtime class has been seen.
    #[must_use]
    pub fn saw_runtime(&self) -> bool {
        self.saw_runtime
    }

    /// Runs the folding rounds.
    #[must_use]
    pub fn finish(self, exceptions: &[String]) -> DexClassSummary {
        DexClassSummary {
            entries: fold(self.paths, exceptions),
        }
    }
}
