//! Immutable directory trees.
//!
//! A [`Directory`] is a value: "modifying" a tree returns a new tree and
//! leaves the original untouched. Lookups are case-insensitive.

use crate::{error::Result, Error, FilePath, FileReference};
use std::collections::BTreeMap;

/// A directory node and everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: FilePath,
    /// Files keyed by lower-invariant name
    files: BTreeMap<String, FileReference>,
    /// Subdirectories keyed by lower-invariant name
    directories: BTreeMap<String, Directory>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::root()
    }
}

impl Directory {
    /// Create an empty root directory.
    pub fn root() -> Self {
        Self::empty(FilePath::root())
    }

    fn empty(path: FilePath) -> Self {
        Self {
            path,
            files: BTreeMap::new(),
            directories: BTreeMap::new(),
        }
    }

    /// Build a root directory from a set of files.
    ///
    /// Later files replace earlier ones at the same path. Fails when a file
    /// sits at the root or shares its name with a directory.
    pub fn from_files(files: impl IntoIterator<Item = FileReference>) -> Result<Self> {
        let mut root = Self::root();
        for file in files {
            root.insert_file(file)?;
        }
        Ok(root)
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name().unwrap_or_default()
    }

    /// Whether a file exists at `path`.
    pub fn file_exists(&self, path: &FilePath) -> bool {
        self.get_file(path).is_some()
    }

    /// Look up a file by rooted path.
    pub fn get_file(&self, path: &FilePath) -> Option<&FileReference> {
        let name = path.name()?;
        let parent = self.get_directory(&path.parent()?)?;
        parent.files.get(&name.to_lowercase())
    }

    /// Look up a directory by rooted path.
    pub fn get_directory(&self, path: &FilePath) -> Option<&Directory> {
        let mut current = self;
        for segment in path.segments() {
            current = current.directories.get(&segment.to_lowercase())?;
        }
        Some(current)
    }

    /// Files directly in this directory.
    pub fn files(&self) -> impl Iterator<Item = &FileReference> {
        self.files.values()
    }

    /// Direct subdirectories.
    pub fn directories(&self) -> impl Iterator<Item = &Directory> {
        self.directories.values()
    }

    /// All files in this directory and below, ordered by normalized path.
    pub fn all_files(&self) -> Vec<&FileReference> {
        let mut files = Vec::new();
        self.collect_files(&mut files);
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileReference>) {
        out.extend(self.files.values());
        for dir in self.directories.values() {
            dir.collect_files(out);
        }
    }

    /// Total number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .directories
                .values()
                .map(Directory::file_count)
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Return a new tree with `file` added or replaced.
    pub fn with_file(&self, file: FileReference) -> Result<Directory> {
        let mut tree = self.clone();
        tree.insert_file(file)?;
        Ok(tree)
    }

    /// Return a new tree without the file at `path`.
    pub fn without_file(&self, path: &FilePath) -> Directory {
        let mut tree = self.clone();
        tree.remove_file(path);
        tree
    }

    /// Insert a file, creating intermediate directories.
    ///
    /// Only called on root directories. The tree is left untouched when
    /// the file cannot be placed.
    pub(crate) fn insert_file(&mut self, file: FileReference) -> Result<()> {
        let (Some(name), Some(parent)) = (file.path.name(), file.path.parent()) else {
            return Err(Error::InvalidPath {
                path: file.path.to_string(),
                reason: "a file cannot live at the root".to_string(),
            });
        };
        let name = name.to_lowercase();
        self.check_placement(&parent, &name, &file.path)?;

        let mut current = self;
        let mut current_path = FilePath::root();
        for segment in parent.segments() {
            current_path = current_path.join(segment)?;
            let child_path = current_path.clone();
            current = current
                .directories
                .entry(segment.to_lowercase())
                .or_insert_with(|| Directory::empty(child_path));
        }
        current.files.insert(name, file);
        Ok(())
    }

    /// A file may not stand where a directory is needed, nor the other way
    /// round.
    fn check_placement(&self, parent: &FilePath, name: &str, path: &FilePath) -> Result<()> {
        let mut current = self;
        let mut current_path = FilePath::root();
        for segment in parent.segments() {
            let key = segment.to_lowercase();
            current_path = current_path.join(segment)?;
            if current.files.contains_key(&key) {
                return Err(Error::FileAlreadyExists(current_path));
            }
            match current.directories.get(&key) {
                Some(dir) => current = dir,
                None => return Ok(()),
            }
        }
        if current.directories.contains_key(name) {
            return Err(Error::FileAlreadyExists(path.clone()));
        }
        Ok(())
    }

    /// Remove a file, pruning directories left empty.
    ///
    /// Only called on root directories.
    pub(crate) fn remove_file(&mut self, path: &FilePath) -> Option<FileReference> {
        let segments: Vec<String> = path.segments().map(str::to_lowercase).collect();
        Self::remove_at(self, &segments)
    }

    fn remove_at(dir: &mut Directory, segments: &[String]) -> Option<FileReference> {
        match segments {
            [] => None,
            [name] => dir.files.remove(name),
            [head, rest @ ..] => {
                let child = dir.directories.get_mut(head)?;
                let removed = Self::remove_at(child, rest);
                if removed.is_some() && child.files.is_empty() && child.directories.is_empty() {
                    dir.directories.remove(head);
                }
                removed
            }
        }
    }
}
