//! The filesystem engine: whole-path operations over the flat store.
//!
//! One async mutex guards all mutable state and stays held for the full
//! duration of an operation, remote calls included. That makes the lazy
//! content download at-most-once per path and keeps share create/destroy
//! atomic with respect to every other operation.

use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, info};
use tokio::sync::Mutex;

use crate::gett_service::client::{RemoteContentSource, RemoteShareClient};
use crate::gett_service::models::{AccountSnapshot, StorageQuota};
use crate::vfs::content::ContentCache;
use crate::vfs::directory::DirectoryView;
use crate::vfs::error::VfsError;
use crate::vfs::inode::{time_from_epoch, FileStat, Inode, InodeKind, RemoteRef};
use crate::vfs::path_store::{join_child, parent_of, PathStore, ROOT_PATH};

/// Block size the quota is reported in via statfs.
const STATFS_BLOCK_SIZE: u64 = 1024;

/// Filesystem-level statistics derived from the account quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub bsize: u32,
}

/// State guarded by the single engine lock.
struct VfsState {
    store: PathStore,
    content: ContentCache,
    next_handle: u64,
}

impl VfsState {
    fn alloc_handle(&mut self) -> u64 {
        let fh = self.next_handle;
        self.next_handle += 1;
        fh
    }
}

/// The mounted Ge.tt account as a path-addressed filesystem.
pub struct GettVfs {
    state: Mutex<VfsState>,
    shares: Arc<dyn RemoteShareClient>,
    content_source: Arc<dyn RemoteContentSource>,
    quota: StorageQuota,
}

impl GettVfs {
    /// Build the tree from the login-time account snapshot.
    ///
    /// Every share becomes a top-level directory named by its title (share
    /// name when untitled); every listed file becomes a regular file whose
    /// content stays remote until first read.
    pub fn from_snapshot(
        snapshot: AccountSnapshot,
        shares: Arc<dyn RemoteShareClient>,
        content_source: Arc<dyn RemoteContentSource>,
    ) -> Self {
        let now = SystemTime::now();
        let mut store = PathStore::new();

        let mut root = Inode::directory(0o755, now);
        root.nlink = 2 + snapshot.shares.len() as u32;
        store.insert(ROOT_PATH, root);

        for share in &snapshot.shares {
            let dir_path = join_child(ROOT_PATH, share.display_name());
            let mut dir = Inode::directory(0o755, time_from_epoch(share.created))
                .with_remote(RemoteRef::share(share.sharename.clone()));
            dir.atime = now;
            dir.nlink = 2 + share.files.len() as u32;
            store.insert(&dir_path, dir);

            for file in &share.files {
                let file_path = join_child(&dir_path, &file.filename);
                let mut inode = Inode::regular_file(0o755, time_from_epoch(file.created))
                    .with_remote(RemoteRef::file(share.sharename.clone(), file.fileid.clone()));
                inode.atime = now;
                inode.size = file.size.unwrap_or(0);
                store.insert(&file_path, inode);
            }
        }

        info!(
            "seeded {} entries from {} shares",
            store.len(),
            snapshot.shares.len()
        );

        GettVfs {
            state: Mutex::new(VfsState {
                store,
                content: ContentCache::new(),
                next_handle: 1,
            }),
            shares,
            content_source,
            quota: snapshot.quota,
        }
    }

    /// Attribute snapshot for `path`.
    pub async fn getattr(&self, path: &str) -> Result<FileStat, VfsError> {
        let state = self.state.lock().await;
        let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
        Ok(inode.stat())
    }

    /// Entry names of directory `path`, `.` and `..` included.
    pub async fn readdir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let state = self.state.lock().await;
        let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
        if !inode.is_dir() {
            return Err(VfsError::NotADirectory(path.to_string()));
        }
        Ok(DirectoryView::list_children(&state.store, path))
    }

    /// Allocate a handle for an existing entry.
    pub async fn open(&self, path: &str) -> Result<u64, VfsError> {
        let mut state = self.state.lock().await;
        if !state.store.contains(path) {
            return Err(VfsError::not_found(path));
        }
        let fh = state.alloc_handle();
        debug!("open {} -> fh {}", path, fh);
        Ok(fh)
    }

    /// Create an empty regular file and return a handle to it.
    pub async fn create_file(&self, path: &str, mode: u32) -> Result<u64, VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        Self::require_directory(&state.store, parent_of(path))?;

        let now = SystemTime::now();
        state.store.insert(path, Inode::regular_file(mode & 0o7777, now));
        state.content.insert(path, Vec::new());
        let fh = state.alloc_handle();
        debug!("create {} -> fh {}", path, fh);
        Ok(fh)
    }

    /// Read up to `size` bytes at `offset`, downloading remote content on the
    /// first touch. Reads past the end return the available tail, or nothing.
    pub async fn read(&self, path: &str, size: u32, offset: i64) -> Result<Vec<u8>, VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let remote = state
            .store
            .get(path)
            .ok_or_else(|| VfsError::not_found(path))?
            .remote
            .clone();

        if let Some(len) = state
            .content
            .ensure_resident(path, remote.as_ref(), self.content_source.as_ref())
            .await?
        {
            if let Some(inode) = state.store.get_mut(path) {
                inode.size = len;
            }
        }

        let offset = offset.max(0) as usize;
        Ok(state.content.read_range(path, offset, size as usize).to_vec())
    }

    /// Write `data` at `offset`; bytes previously stored past the write are
    /// discarded. Returns the number of bytes written.
    pub async fn write(&self, path: &str, data: &[u8], offset: i64) -> Result<u32, VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.store.contains(path) {
            return Err(VfsError::not_found(path));
        }

        let offset = offset.max(0) as usize;
        let new_len = state.content.write_range(path, offset, data);
        if let Some(inode) = state.store.get_mut(path) {
            inode.size = new_len as u64;
            inode.mtime = SystemTime::now();
        }
        Ok(data.len() as u32)
    }

    /// Cut or zero-extend the file to exactly `length` bytes.
    pub async fn truncate(&self, path: &str, length: u64) -> Result<(), VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.store.contains(path) {
            return Err(VfsError::not_found(path));
        }

        state.content.truncate(path, length as usize);
        if let Some(inode) = state.store.get_mut(path) {
            inode.size = length;
            inode.mtime = SystemTime::now();
        }
        Ok(())
    }

    /// Create a directory backed by a fresh share named after the path.
    ///
    /// The share is created remotely first; when that fails nothing changes
    /// locally.
    pub async fn mkdir(&self, path: &str, mode: u32) -> Result<(), VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let parent = parent_of(path);
        Self::require_directory(&state.store, parent)?;

        let share_name = path.trim_start_matches('/').to_string();
        self.shares
            .create_share(&share_name)
            .await
            .map_err(VfsError::RemoteShare)?;

        let now = SystemTime::now();
        let dir = Inode::directory(mode & 0o7777, now).with_remote(RemoteRef::share(share_name));
        state.store.insert(path, dir);
        if let Some(parent_inode) = state.store.get_mut(parent) {
            parent_inode.nlink += 1;
        }
        Ok(())
    }

    /// Destroy the backing share and drop the directory plus every entry
    /// belonging to the same share, wherever it lives in the tree.
    ///
    /// The share is destroyed remotely first; when that fails nothing changes
    /// locally.
    pub async fn rmdir(&self, path: &str) -> Result<(), VfsError> {
        if path == ROOT_PATH {
            return Err(VfsError::NotPermitted(path.to_string()));
        }
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let share_name = {
            let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
            if !inode.is_dir() {
                return Err(VfsError::NotADirectory(path.to_string()));
            }
            inode.share_name().map(str::to_string)
        };

        if let Some(name) = share_name.as_deref() {
            self.shares
                .destroy_share(name)
                .await
                .map_err(VfsError::RemoteShare)?;
        }

        state.store.remove(path);
        state.content.remove(path);
        if let Some(parent_inode) = state.store.get_mut(parent_of(path)) {
            parent_inode.nlink = parent_inode.nlink.saturating_sub(1);
        }

        if let Some(name) = share_name.as_deref() {
            let members: Vec<String> = state
                .store
                .iter()
                .filter(|(_, inode)| inode.share_name() == Some(name))
                .map(|(p, _)| p.clone())
                .collect();
            for member in &members {
                state.store.remove(member);
                state.content.remove(member);
            }
            info!(
                "rmdir {} dropped share '{}' and {} member entries",
                path,
                name,
                members.len()
            );
        }
        Ok(())
    }

    /// Move an entry, and for directories the whole subtree under it.
    /// Whatever was stored at `new` is replaced, content buffer included.
    /// A directory cannot be moved underneath itself.
    pub async fn rename(&self, old: &str, new: &str) -> Result<(), VfsError> {
        if old == ROOT_PATH || new == ROOT_PATH {
            return Err(VfsError::NotPermitted(ROOT_PATH.to_string()));
        }
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let is_dir = state
            .store
            .get(old)
            .ok_or_else(|| VfsError::not_found(old))?
            .is_dir();
        if is_dir && new.starts_with(&format!("{}/", old)) {
            return Err(VfsError::NotPermitted(new.to_string()));
        }
        Self::require_directory(&state.store, parent_of(new))?;

        state.store.rename(old, new)?;
        state.content.rename_key(old, new);

        if is_dir {
            let prefix = format!("{}/", old);
            let descendants: Vec<String> = state
                .store
                .paths()
                .filter(|p| p.starts_with(&prefix))
                .cloned()
                .collect();
            for descendant in &descendants {
                let moved = format!("{}{}", new, &descendant[old.len()..]);
                state.store.rename(descendant, &moved)?;
                state.content.rename_key(descendant, &moved);
            }
            debug!(
                "rename {} -> {} moved {} descendants",
                old,
                new,
                descendants.len()
            );
        }
        Ok(())
    }

    /// Drop a single entry and its content. Does not touch the remote side.
    pub async fn unlink(&self, path: &str) -> Result<(), VfsError> {
        if path == ROOT_PATH {
            return Err(VfsError::NotPermitted(path.to_string()));
        }
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.store.remove(path).ok_or_else(|| VfsError::not_found(path))?;
        state.content.remove(path);
        Ok(())
    }

    /// Create a symlink at `link_path` pointing at `target`.
    pub async fn symlink(&self, link_path: &str, target: &str) -> Result<(), VfsError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        Self::require_directory(&state.store, parent_of(link_path))?;

        let data = target.as_bytes().to_vec();
        let now = SystemTime::now();
        state.store.insert(link_path, Inode::symlink(data.len() as u64, now));
        state.content.insert(link_path, data);
        Ok(())
    }

    /// Target bytes of the symlink at `path`.
    pub async fn readlink(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let state = self.state.lock().await;
        let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
        if inode.kind != InodeKind::Symlink {
            return Err(VfsError::NotASymlink(path.to_string()));
        }
        Ok(state.content.get(path).unwrap_or_default().to_vec())
    }

    /// Replace the permission bits, leaving the kind untouched.
    pub async fn chmod(&self, path: &str, mode: u32) -> Result<(), VfsError> {
        let mut state = self.state.lock().await;
        let inode = state.store.get_mut(path).ok_or_else(|| VfsError::not_found(path))?;
        inode.mode = mode & 0o7777;
        Ok(())
    }

    /// Set owner and group; `None` leaves the respective id untouched.
    pub async fn chown(
        &self,
        path: &str,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> Result<(), VfsError> {
        let mut state = self.state.lock().await;
        let inode = state.store.get_mut(path).ok_or_else(|| VfsError::not_found(path))?;
        if let Some(uid) = uid {
            inode.uid = Some(uid);
        }
        if let Some(gid) = gid {
            inode.gid = Some(gid);
        }
        Ok(())
    }

    /// Set access and modification times; `None` leaves a time untouched.
    pub async fn utimens(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> Result<(), VfsError> {
        let mut state = self.state.lock().await;
        let inode = state.store.get_mut(path).ok_or_else(|| VfsError::not_found(path))?;
        if let Some(atime) = atime {
            inode.atime = atime;
        }
        if let Some(mtime) = mtime {
            inode.mtime = mtime;
        }
        Ok(())
    }

    pub async fn set_xattr(&self, path: &str, name: &str, value: &[u8]) -> Result<(), VfsError> {
        let mut state = self.state.lock().await;
        let inode = state.store.get_mut(path).ok_or_else(|| VfsError::not_found(path))?;
        inode.xattrs_mut().insert(name.to_string(), value.to_vec());
        Ok(())
    }

    /// Value of an extended attribute; unset names read as empty.
    pub async fn get_xattr(&self, path: &str, name: &str) -> Result<Vec<u8>, VfsError> {
        let state = self.state.lock().await;
        let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
        Ok(inode
            .xattrs
            .as_ref()
            .and_then(|m| m.get(name))
            .cloned()
            .unwrap_or_default())
    }

    pub async fn list_xattr(&self, path: &str) -> Result<Vec<String>, VfsError> {
        let state = self.state.lock().await;
        let inode = state.store.get(path).ok_or_else(|| VfsError::not_found(path))?;
        let mut names: Vec<String> = inode
            .xattrs
            .as_ref()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    /// Remove an extended attribute; removing an unset name is fine.
    pub async fn remove_xattr(&self, path: &str, name: &str) -> Result<(), VfsError> {
        let mut state = self.state.lock().await;
        let inode = state.store.get_mut(path).ok_or_else(|| VfsError::not_found(path))?;
        if let Some(map) = inode.xattrs.as_mut() {
            map.remove(name);
        }
        Ok(())
    }

    /// Quota-derived filesystem statistics, fixed at mount time.
    pub fn statfs(&self) -> FsStats {
        let blocks = self.quota.limit / STATFS_BLOCK_SIZE;
        let free = self.quota.limit.saturating_sub(self.quota.used) / STATFS_BLOCK_SIZE;
        FsStats {
            blocks,
            bfree: free,
            bavail: free,
            bsize: STATFS_BLOCK_SIZE as u32,
        }
    }

    fn require_directory(store: &PathStore, path: &str) -> Result<(), VfsError> {
        match store.get(path) {
            None => Err(VfsError::not_found(path)),
            Some(inode) if !inode.is_dir() => Err(VfsError::NotADirectory(path.to_string())),
            Some(_) => Ok(()),
        }
    }
}
