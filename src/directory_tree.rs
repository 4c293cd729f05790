//! Directory Tree Resolution
//!
//! Collects (record, name, parent) tuples for directory records and resolves
//! them into full paths by walking parent references up to the root.
//! Chains that leave the collected set, or loop, resolve under the orphan
//! marker instead of being dropped.

use crate::ntfs::structs::{ORPHAN_MARKER, ROOT_RECORD_NUMBER};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};

const PATH_SEPARATOR: char = '\\';

// ============================================================================
// Directory Entry
// ============================================================================

/// A directory's identity before path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub record_number: u64,
    pub name: String,
    pub parent_record_number: u64,
}

// ============================================================================
// Unresolved Tree
// ============================================================================

/// Flat record number -> entry mapping accumulated during the first pass
#[derive(Debug, Clone, Default)]
pub struct UnresolvedDirectoryTree {
    entries: HashMap<u64, DirectoryEntry>,
}

impl UnresolvedDirectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: DirectoryEntry) {
        self.entries.insert(entry.record_number, entry);
    }

    /// Union with another accumulator (order independent for distinct keys)
    pub fn merge(&mut self, other: UnresolvedDirectoryTree) {
        self.entries.extend(other.entries);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve every entry to a full path rooted at `<volume_letter>:\`
    pub fn resolve(&self, volume_letter: char) -> DirectoryTree {
        let root_prefix = format!("{}:{}", volume_letter.to_ascii_uppercase(), PATH_SEPARATOR);
        let mut paths = HashMap::with_capacity(self.entries.len() + 1);
        let mut orphan_count = 0;

        for (&record_number, entry) in &self.entries {
            let (path, orphaned) = self.build_path(record_number, entry, &root_prefix);
            if orphaned {
                orphan_count += 1;
            }
            paths.insert(record_number, path);
        }

        // The root always resolves, even if its own record was not captured
        paths.insert(ROOT_RECORD_NUMBER, root_prefix.clone());

        debug!(
            "resolved {} directories ({} orphaned)",
            paths.len(),
            orphan_count
        );

        DirectoryTree {
            paths,
            root_prefix,
            orphan_count,
            collected: self.entries.len(),
        }
    }

    /// Walk parent references upward; returns the path and whether it is orphaned
    fn build_path(
        &self,
        record_number: u64,
        entry: &DirectoryEntry,
        root_prefix: &str,
    ) -> (String, bool) {
        if record_number == ROOT_RECORD_NUMBER {
            return (root_prefix.to_string(), false);
        }

        let mut parts = vec![entry.name.as_str()];
        let mut visited = HashSet::from([record_number]);
        let mut current = entry.parent_record_number;

        let orphaned = loop {
            if current == ROOT_RECORD_NUMBER {
                break false;
            }
            match self.entries.get(&current) {
                Some(parent) if visited.insert(current) => {
                    parts.push(parent.name.as_str());
                    current = parent.parent_record_number;
                }
                Some(_) => {
                    trace!("cycle through record {} while resolving {}", current, record_number);
                    break true;
                }
                None => break true,
            }
        };

        parts.reverse();
        let joined = parts.join(&PATH_SEPARATOR.to_string());
        let path = if orphaned {
            format!("{}{}{}", ORPHAN_MARKER, PATH_SEPARATOR, joined)
        } else {
            format!("{}{}", root_prefix, joined)
        };
        (path, orphaned)
    }
}

impl FromIterator<DirectoryEntry> for UnresolvedDirectoryTree {
    fn from_iter<I: IntoIterator<Item = DirectoryEntry>>(iter: I) -> Self {
        let mut tree = Self::new();
        for entry in iter {
            tree.insert(entry);
        }
        tree
    }
}

// ============================================================================
// Resolved Tree
// ============================================================================

/// Read-only record number -> full path lookup
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    paths: HashMap<u64, String>,
    root_prefix: String,
    orphan_count: usize,
    collected: usize,
}

impl DirectoryTree {
    pub fn get(&self, record_number: u64) -> Option<&str> {
        self.paths.get(&record_number).map(String::as_str)
    }

    /// Path of a parent directory, or the orphan marker when it is unknown
    pub fn parent_path(&self, parent_record_number: u64) -> &str {
        self.get(parent_record_number).unwrap_or(ORPHAN_MARKER)
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Number of directories whose chain did not reach the root
    pub fn orphan_count(&self) -> usize {
        self.orphan_count
    }

    /// Directories taken from the input, excluding a seeded root
    pub fn collected_count(&self) -> usize {
        self.collected
    }

    /// Resolved paths, including the root
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.paths.iter().map(|(&k, v)| (k, v.as_str()))
    }
}

/// Join a directory path and a file name with a single separator
pub fn join_path(directory: &str, name: &str) -> String {
    if directory.ends_with(PATH_SEPARATOR) {
        format!("{}{}", directory, name)
    } else {
        format!("{}{}{}", directory, PATH_SEPARATOR, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(record_number: u64, name: &str, parent_record_number: u64) -> DirectoryEntry {
        DirectoryEntry {
            record_number,
            name: name.to_string(),
            parent_record_number,
        }
    }

    #[test]
    fn resolves_nested_directories() {
        let unresolved: UnresolvedDirectoryTree = [
            dir(5, ".", 5),
            dir(10, "Users", 5),
            dir(20, "Public", 10),
        ]
        .into_iter()
        .collect();

        let tree = unresolved.resolve('C');
        assert_eq!(tree.get(5), Some("C:\\"));
        assert_eq!(tree.get(10), Some("C:\\Users"));
        assert_eq!(tree.get(20), Some("C:\\Users\\Public"));
        assert_eq!(tree.orphan_count(), 0);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn missing_parent_is_orphaned() {
        let unresolved: UnresolvedDirectoryTree =
            [dir(10, "Users", 5), dir(20, "Public", 99), dir(30, "Docs", 20)]
                .into_iter()
                .collect();

        let tree = unresolved.resolve('c');
        assert_eq!(tree.get(20), Some("$ORPHANFILE\\Public"));
        assert_eq!(tree.get(30), Some("$ORPHANFILE\\Public\\Docs"));
        assert_eq!(tree.get(10), Some("C:\\Users"));
        assert_eq!(tree.orphan_count(), 2);
    }

    #[test]
    fn cycle_terminates_as_orphan() {
        let unresolved: UnresolvedDirectoryTree =
            [dir(40, "a", 41), dir(41, "b", 40), dir(42, "self", 42)]
                .into_iter()
                .collect();

        let tree = unresolved.resolve('C');
        assert!(tree.get(40).unwrap().starts_with("$ORPHANFILE\\"));
        assert!(tree.get(41).unwrap().starts_with("$ORPHANFILE\\"));
        assert_eq!(tree.get(42), Some("$ORPHANFILE\\self"));
        assert_eq!(tree.orphan_count(), 3);
    }

    #[test]
    fn root_is_seeded_without_its_record() {
        let unresolved: UnresolvedDirectoryTree = [dir(10, "Windows", 5)].into_iter().collect();
        let tree = unresolved.resolve('D');
        assert_eq!(tree.root_prefix(), "D:\\");
        assert_eq!(tree.get(5), Some("D:\\"));
        assert_eq!(tree.get(10), Some("D:\\Windows"));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.collected_count(), 1);
    }

    #[test]
    fn parent_path_falls_back_to_marker() {
        let tree = UnresolvedDirectoryTree::new().resolve('C');
        assert_eq!(tree.parent_path(5), "C:\\");
        assert_eq!(tree.parent_path(1234), "$ORPHANFILE");
    }

    #[test]
    fn merge_unions_worker_maps() {
        let mut a: UnresolvedDirectoryTree = [dir(10, "Users", 5)].into_iter().collect();
        let b: UnresolvedDirectoryTree = [dir(20, "Public", 10)].into_iter().collect();
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.resolve('C').get(20), Some("C:\\Users\\Public"));
    }

    #[test]
    fn join_path_single_separator() {
        assert_eq!(join_path("C:\\", "file.txt"), "C:\\file.txt");
        assert_eq!(join_path("C:\\Users", "file.txt"), "C:\\Users\\file.txt");
        assert_eq!(join_path("$ORPHANFILE", "x"), "$ORPHANFILE\\x");
    }
}
