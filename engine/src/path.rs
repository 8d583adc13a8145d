//! Rooted, case-insensitive file paths.
//!
//! Paths are compared, hashed and ordered by their lower-invariant form so
//! that `/Docs/Readme.md` and `/docs/README.md` address the same file. The
//! original spelling is kept for display.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Path separator used by all rooted paths.
pub const SEPARATOR: char = '/';

/// A rooted path such as `/dir/file.txt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePath {
    original: String,
    normalized: String,
}

impl FilePath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            original: SEPARATOR.to_string(),
            normalized: SEPARATOR.to_string(),
        }
    }

    /// Parse and validate a rooted path.
    ///
    /// A trailing separator is ignored. Empty, `.` and `..` segments are
    /// rejected.
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if !path.starts_with(SEPARATOR) {
            return Err(invalid("path must be rooted"));
        }

        let trimmed = path.trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        for segment in trimmed[1..].split(SEPARATOR) {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative path segment")),
                s if s.trim().is_empty() => return Err(invalid("blank path segment")),
                _ => {}
            }
        }

        Ok(Self::from_validated(trimmed))
    }

    fn from_validated(original: &str) -> Self {
        Self {
            original: original.to_string(),
            normalized: original.to_lowercase(),
        }
    }

    /// The path as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// The lower-invariant form used for comparisons.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_root(&self) -> bool {
        self.original.len() == 1
    }

    /// Path segments, excluding the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.original[1..].split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last path segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.original.rsplit(SEPARATOR).next()
    }

    /// Parent directory, or `None` for the root.
    pub fn parent(&self) -> Option<FilePath> {
        if self.is_root() {
            return None;
        }
        let idx = self.original.rfind(SEPARATOR)?;
        if idx == 0 {
            return Some(Self::root());
        }
        Some(Self::from_validated(&self.original[..idx]))
    }

    /// Append a single segment.
    pub fn join(&self, name: &str) -> Result<FilePath> {
        if self.is_root() {
            Self::parse(&format!("{SEPARATOR}{name}"))
        } else {
            Self::parse(&format!("{}{SEPARATOR}{name}", self.original))
        }
    }

    /// Whether `self` equals `prefix` or lies below it, segment-wise.
    pub fn starts_with(&self, prefix: &FilePath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.normalized.strip_prefix(prefix.normalized.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

impl PartialEq for FilePath {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for FilePath {}

impl Hash for FilePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl Ord for FilePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl PartialOrd for FilePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl TryFrom<String> for FilePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for FilePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> Self {
        path.original
    }
}
