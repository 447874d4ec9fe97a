//! Mapping between kernel inode numbers and engine paths.

use std::collections::HashMap;

use fuser::FUSE_ROOT_ID;

use crate::vfs::path_store::ROOT_PATH;

/// Bidirectional ino <-> path table.
///
/// The engine is path-addressed while the kernel speaks inode numbers. The
/// table pins the root at [`FUSE_ROOT_ID`], allocates numbers monotonically
/// on first sight, and is rewritten on rename so numbers follow their
/// entries.
#[derive(Debug)]
pub struct InodeTable {
    by_ino: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next_ino: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut table = InodeTable {
            by_ino: HashMap::new(),
            by_path: HashMap::new(),
            next_ino: FUSE_ROOT_ID + 1,
        };
        table.bind(ROOT_PATH.to_string(), FUSE_ROOT_ID);
        table
    }

    /// Number for `path`, allocating one on first sight.
    pub fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.bind(path.to_string(), ino);
        ino
    }

    pub fn path_of(&self, ino: u64) -> Option<&str> {
        self.by_ino.get(&ino).map(String::as_str)
    }

    /// Drop the mapping for one path.
    pub fn forget_path(&mut self, path: &str) {
        if let Some(ino) = self.by_path.remove(path) {
            self.by_ino.remove(&ino);
        }
    }

    /// Drop the mappings for `path` and everything below it.
    pub fn forget_subtree(&mut self, path: &str) {
        self.forget_path(path);
        let prefix = format!("{}/", path);
        let victims: Vec<String> = self
            .by_path
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        for victim in victims {
            self.forget_path(&victim);
        }
    }

    /// Re-point the numbers bound under `old` (the path itself and all
    /// descendants) at their locations under `new`, keeping the numbers.
    pub fn retarget_prefix(&mut self, old: &str, new: &str) {
        let mut moved: Vec<(String, u64)> = Vec::new();
        if let Some(ino) = self.by_path.remove(old) {
            moved.push((new.to_string(), ino));
        }
        let prefix = format!("{}/", old);
        let descendants: Vec<String> = self
            .by_path
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        for descendant in descendants {
            if let Some(ino) = self.by_path.remove(&descendant) {
                let target = format!("{}{}", new, &descendant[old.len()..]);
                moved.push((target, ino));
            }
        }
        for (path, ino) in moved {
            self.bind(path, ino);
        }
    }

    /// Bind `path` to `ino` in both directions, unbinding any number that
    /// previously pointed at the path.
    fn bind(&mut self, path: String, ino: u64) {
        if let Some(previous) = self.by_path.get(&path) {
            self.by_ino.remove(previous);
        }
        self.by_path.insert(path.clone(), ino);
        self.by_ino.insert(ino, path);
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
