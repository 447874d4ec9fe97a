//! Directory listings recovered from the flat path map.

use crate::vfs::path_store::{PathStore, ROOT_PATH};

/// Stateless view producing directory contents by scanning path keys.
pub struct DirectoryView;

impl DirectoryView {
    /// Names of the entries in directory `path`, `.` and `..` included.
    ///
    /// A stored path counts as a child iff it is exactly one level below
    /// `path`, so `/ab` is never listed under `/a`. Child names are sorted
    /// to keep readdir offsets stable across calls.
    pub fn list_children(store: &PathStore, path: &str) -> Vec<String> {
        let prefix = if path == ROOT_PATH {
            ROOT_PATH.to_string()
        } else {
            format!("{}/", path)
        };

        let mut children: Vec<String> = store
            .paths()
            .filter(|p| p.as_str() != ROOT_PATH)
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        children.sort();

        let mut names = Vec::with_capacity(children.len() + 2);
        names.push(".".to_string());
        names.push("..".to_string());
        names.extend(children);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::inode::Inode;
    use std::time::SystemTime;

    fn store_with(paths: &[&str]) -> PathStore {
        let now = SystemTime::now();
        let mut store = PathStore::new();
        store.insert("/", Inode::directory(0o755, now));
        for p in paths {
            if p.ends_with('d') {
                store.insert(p, Inode::directory(0o755, now));
            } else {
                store.insert(p, Inode::regular_file(0o644, now));
            }
        }
        store
    }

    #[test]
    fn test_root_listing_has_dots_and_top_level_entries() {
        let store = store_with(&["/shared", "/other.txt"]);
        let names = DirectoryView::list_children(&store, "/");
        assert_eq!(names, vec![".", "..", "other.txt", "shared"]);
    }

    #[test]
    fn test_nested_listing_excludes_grandchildren() {
        let store = store_with(&["/ad", "/ad/x.txt", "/ad/subd", "/ad/subd/y.txt"]);
        let names = DirectoryView::list_children(&store, "/ad");
        assert_eq!(names, vec![".", "..", "subd", "x.txt"]);
    }

    #[test]
    fn test_sibling_prefix_is_not_a_child() {
        let store = store_with(&["/ad", "/abd", "/ad/inner.txt"]);
        let names = DirectoryView::list_children(&store, "/ad");
        assert_eq!(names, vec![".", "..", "inner.txt"]);
    }

    #[test]
    fn test_empty_directory_lists_only_dots() {
        let store = store_with(&["/emptyd"]);
        let names = DirectoryView::list_children(&store, "/emptyd");
        assert_eq!(names, vec![".", ".."]);
    }
}
