//! In-memory file content, downloaded on first use.

use std::collections::HashMap;

use log::{debug, info};

use crate::gett_service::client::RemoteContentSource;
use crate::vfs::error::VfsError;
use crate::vfs::inode::RemoteRef;

/// Path-keyed byte buffers holding file content and symlink targets.
///
/// Remote file content stays absent until the first read asks for it; locally
/// created files get an empty buffer right away. Writes follow the
/// replace-the-tail rule: everything past the write offset is discarded.
#[derive(Debug, Default)]
pub struct ContentCache {
    buffers: HashMap<String, Vec<u8>>,
}

impl ContentCache {
    pub fn new() -> Self {
        ContentCache {
            buffers: HashMap::new(),
        }
    }

    pub fn is_resident(&self, path: &str) -> bool {
        self.buffers.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.buffers.get(path).map(|b| b.as_slice())
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.buffers.insert(path.to_string(), bytes);
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.buffers.remove(path)
    }

    /// Move the buffer at `old` to `new`. The destination ends up mirroring
    /// the source either way: resident content moves over, and an absent
    /// source clears whatever the destination held, so a cold path stays
    /// cold after a rename lands on it.
    pub fn rename_key(&mut self, old: &str, new: &str) {
        match self.buffers.remove(old) {
            Some(buf) => {
                self.buffers.insert(new.to_string(), buf);
            }
            None => {
                self.buffers.remove(new);
            }
        }
    }

    /// Bytes `[offset, offset + size)` clamped to the buffer. Absent buffers
    /// read as empty.
    pub fn read_range(&self, path: &str, offset: usize, size: usize) -> &[u8] {
        match self.buffers.get(path) {
            None => &[],
            Some(buf) => {
                let start = offset.min(buf.len());
                let end = offset.saturating_add(size).min(buf.len());
                &buf[start..end]
            }
        }
    }

    /// Write `data` at `offset`, discarding anything previously stored past
    /// the write. A missing buffer starts out empty. Returns the new buffer
    /// length.
    pub fn write_range(&mut self, path: &str, offset: usize, data: &[u8]) -> usize {
        let buf = self.buffers.entry(path.to_string()).or_default();
        let keep = offset.min(buf.len());
        buf.truncate(keep);
        buf.extend_from_slice(data);
        buf.len()
    }

    /// Resize the buffer to exactly `len` bytes, zero-filling on extension.
    pub fn truncate(&mut self, path: &str, len: usize) {
        let buf = self.buffers.entry(path.to_string()).or_default();
        buf.resize(len, 0);
    }

    /// Download the backing blob unless `path` already has a buffer.
    ///
    /// Returns the fetched length, or `None` when nothing had to be fetched
    /// (already resident, or no remote file behind the path). A failed
    /// download stores nothing, so the next read triggers a fresh attempt.
    pub async fn ensure_resident(
        &mut self,
        path: &str,
        remote: Option<&RemoteRef>,
        source: &dyn RemoteContentSource,
    ) -> Result<Option<u64>, VfsError> {
        if self.buffers.contains_key(path) {
            return Ok(None);
        }
        let Some(remote) = remote else {
            return Ok(None);
        };
        let Some(file_id) = remote.file_id.as_deref() else {
            return Ok(None);
        };

        debug!("fetching {}/{} for {}", remote.share_name, file_id, path);
        let blob = source
            .fetch_content(&remote.share_name, file_id)
            .await
            .map_err(VfsError::RemoteContent)?;
        let len = blob.len() as u64;
        info!("cached {} bytes for {}", len, path);
        self.buffers.insert(path.to_string(), blob);
        Ok(Some(len))
    }
}
