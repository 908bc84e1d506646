//! # Path Index
//!
//! Nested lookup of resource names keyed by their ancestor path, so that
//! membership of a leaf under a given ancestor path is an O(depth) walk.
//!
//! ```text
//! qwc_demo
//! ├── edit_lines
//! │   └── Name
//! └── *
//! ```

use std::collections::BTreeMap;

/// One level of a resource path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// A named resource.
    Name(String),
    /// Every resource of the level's type.
    All,
}

impl PathSegment {
    /// Wildcard name used in the store.
    pub const WILDCARD: &'static str = "*";

    /// Convert a stored resource name into a segment.
    ///
    /// # Example
    ///
    /// ```
    /// use permgen_core::index::PathSegment;
    ///
    /// assert_eq!(PathSegment::from_name("*"), PathSegment::All);
    /// assert_eq!(PathSegment::from_name("edit_lines"), PathSegment::Name("edit_lines".into()));
    /// ```
    pub fn from_name(name: &str) -> Self {
        if name == Self::WILDCARD {
            PathSegment::All
        } else {
            PathSegment::Name(name.to_string())
        }
    }

    /// Get the name of a named segment.
    pub fn name(&self) -> Option<&str> {
        match self {
            PathSegment::Name(name) => Some(name),
            PathSegment::All => None,
        }
    }
}

/// Nested lookup tree of resource paths.
///
/// Built once per resolution from grant rows and read-only afterwards.
///
/// # Example
///
/// ```
/// use permgen_core::index::{PathIndex, PathSegment};
///
/// let index = PathIndex::build(vec![
///     vec![PathSegment::from_name("qwc_demo"), PathSegment::from_name("edit_lines")],
///     vec![PathSegment::from_name("qwc_demo"), PathSegment::from_name("*")],
/// ]);
///
/// assert!(index.contains(&["qwc_demo", "edit_lines"]));
/// assert!(!index.contains(&["qwc_demo", "edit_points"]));
/// assert!(index.permits(&["qwc_demo", "edit_points"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    children: BTreeMap<PathSegment, PathIndex>,
}

impl PathIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from root-to-leaf paths.
    ///
    /// Empty input yields an empty index.
    pub fn build<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = PathSegment>,
    {
        let mut index = Self::new();
        for path in paths {
            index.insert(path);
        }
        index
    }

    /// Insert a root-to-leaf path.
    pub fn insert<P>(&mut self, path: P)
    where
        P: IntoIterator<Item = PathSegment>,
    {
        let mut target = self;
        for segment in path {
            target = target.children.entry(segment).or_default();
        }
    }

    /// Check that every segment of `path` exists by exact name.
    ///
    /// `path` may stop above the leaves: `["map"]` is contained as soon as
    /// anything below `map` is.
    pub fn contains(&self, path: &[&str]) -> bool {
        self.subtree(path).is_some()
    }

    /// Check `path` while letting wildcard entries stand in for any name.
    pub fn permits(&self, path: &[&str]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return true;
        };
        let named = self
            .children
            .get(&PathSegment::Name((*first).to_string()))
            .is_some_and(|child| child.permits(rest));
        named
            || self
                .children
                .get(&PathSegment::All)
                .is_some_and(|child| child.permits(rest))
    }

    /// Get the index below an exact path.
    pub fn subtree(&self, path: &[&str]) -> Option<&PathIndex> {
        let mut target = self;
        for name in path {
            target = target.children.get(&PathSegment::Name((*name).to_string()))?;
        }
        Some(target)
    }

    /// Names directly at this level, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().filter_map(PathSegment::name)
    }

    /// Names directly below an exact path, sorted.
    ///
    /// Returns nothing if the path does not exist.
    pub fn names_under(&self, path: &[&str]) -> Vec<&str> {
        self.subtree(path)
            .map(|sub| sub.names().collect())
            .unwrap_or_default()
    }

    /// Iterate over named children at this level, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PathIndex)> {
        self.children
            .iter()
            .filter_map(|(segment, child)| segment.name().map(|name| (name, child)))
    }

    /// Check whether a wildcard entry exists at this level.
    pub fn has_wildcard(&self) -> bool {
        self.children.contains_key(&PathSegment::All)
    }

    /// Get the count of entries at this level.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
