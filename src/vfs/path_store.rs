//! Flat path-keyed store of filesystem metadata.
//!
//! Entries are addressed by absolute path (`/`, `/share`, `/share/file.txt`).
//! There is no tree structure; directory membership is recovered by scanning
//! keys, see [`crate::vfs::directory`].

use std::collections::HashMap;

use crate::vfs::error::VfsError;
use crate::vfs::inode::Inode;

/// Root path of every mount.
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Default)]
pub struct PathStore {
    entries: HashMap<String, Inode>,
}

impl PathStore {
    pub fn new() -> Self {
        PathStore {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&Inode> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Inode> {
        self.entries.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the entry at `path`.
    pub fn insert(&mut self, path: &str, inode: Inode) {
        self.entries.insert(path.to_string(), inode);
    }

    pub fn remove(&mut self, path: &str) -> Option<Inode> {
        self.entries.remove(path)
    }

    /// Move the entry at `old` to `new`, replacing anything already at `new`.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), VfsError> {
        let inode = self.entries.remove(old).ok_or_else(|| VfsError::not_found(old))?;
        self.entries.insert(new.to_string(), inode);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Inode)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parent of an absolute path; the parent of `/` is `/` itself.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT_PATH,
        Some(idx) => &path[..idx],
    }
}

/// Join a directory path and a child name into an absolute path.
pub fn join_child(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::inode::Inode;
    use std::time::SystemTime;

    fn file() -> Inode {
        Inode::regular_file(0o644, SystemTime::now())
    }

    #[test]
    fn test_parent_of_top_level() {
        assert_eq!(parent_of("/share"), "/");
    }

    #[test]
    fn test_parent_of_nested() {
        assert_eq!(parent_of("/share/file.txt"), "/share");
    }

    #[test]
    fn test_parent_of_root_is_root() {
        assert_eq!(parent_of("/"), "/");
    }

    #[test]
    fn test_join_child_at_root() {
        assert_eq!(join_child("/", "share"), "/share");
    }

    #[test]
    fn test_join_child_nested() {
        assert_eq!(join_child("/share", "file.txt"), "/share/file.txt");
    }

    #[test]
    fn test_insert_get_remove() {
        let mut store = PathStore::new();
        store.insert("/a", file());
        assert!(store.contains("/a"));
        assert!(store.get("/a").is_some());
        assert!(store.remove("/a").is_some());
        assert!(!store.contains("/a"));
    }

    #[test]
    fn test_rename_moves_entry() {
        let mut store = PathStore::new();
        let mut inode = file();
        inode.size = 7;
        store.insert("/a", inode);
        store.rename("/a", "/b").unwrap();
        assert!(!store.contains("/a"));
        assert_eq!(store.get("/b").unwrap().size, 7);
    }

    #[test]
    fn test_rename_missing_source_fails() {
        let mut store = PathStore::new();
        assert!(store.rename("/a", "/b").is_err());
    }
}
