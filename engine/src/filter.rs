//! Path-based exclusion of changes from synchronization.

use crate::{error::Result, FilePath};

/// Excludes every path at or below one of a set of rooted prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathFilter {
    excluded: Vec<FilePath>,
}

impl PathFilter {
    /// A filter that excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from rooted path strings.
    pub fn from_prefixes<S: AsRef<str>>(prefixes: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut filter = Self::new();
        for prefix in prefixes {
            filter = filter.exclude(FilePath::parse(prefix.as_ref())?);
        }
        Ok(filter)
    }

    /// Add an excluded prefix.
    pub fn exclude(mut self, prefix: FilePath) -> Self {
        if !self.excluded.contains(&prefix) {
            self.excluded.push(prefix);
        }
        self
    }

    pub fn is_excluded(&self, path: &FilePath) -> bool {
        self.excluded.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn excluded(&self) -> &[FilePath] {
        &self.excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> FilePath {
        FilePath::parse(p).unwrap()
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let filter = PathFilter::new();
        assert!(!filter.is_excluded(&path("/anything")));
    }

    #[test]
    fn excludes_prefixes() {
        let filter = PathFilter::from_prefixes(["/.git", "/build/cache"]).unwrap();
        assert!(filter.is_excluded(&path("/.GIT/config")));
        assert!(filter.is_excluded(&path("/build/cache")));
        assert!(filter.is_excluded(&path("/build/cache/x.bin")));
        assert!(!filter.is_excluded(&path("/build/out.bin")));
        assert!(!filter.is_excluded(&path("/.gitignore")));
    }

    #[test]
    fn rejects_invalid_prefix() {
        assert!(PathFilter::from_prefixes(["relative"]).is_err());
    }

    #[test]
    fn duplicate_prefixes_are_ignored() {
        let filter = PathFilter::new().exclude(path("/a")).exclude(path("/A"));
        assert_eq!(filter.excluded().len(), 1);
    }
}
