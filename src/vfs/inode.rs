//! Metadata records for filesystem entries.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What kind of node an [`Inode`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    Directory,
    RegularFile,
    Symlink,
}

/// Remote location backing an entry.
///
/// Share directories carry only the share name; files inside a share also
/// carry the file id used by the blob download endpoint. Locally created
/// entries have no [`RemoteRef`] at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub share_name: String,
    pub file_id: Option<String>,
}

impl RemoteRef {
    pub fn share(share_name: impl Into<String>) -> Self {
        RemoteRef {
            share_name: share_name.into(),
            file_id: None,
        }
    }

    pub fn file(share_name: impl Into<String>, file_id: impl Into<String>) -> Self {
        RemoteRef {
            share_name: share_name.into(),
            file_id: Some(file_id.into()),
        }
    }
}

/// One filesystem entry. Everything the engine tracks per path.
///
/// `uid`/`gid` stay `None` until a chown; the FUSE layer substitutes the
/// mounting user for `None`. `size` always equals the content buffer length
/// once a buffer exists for the path.
#[derive(Debug, Clone)]
pub struct Inode {
    pub kind: InodeKind,
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub remote: Option<RemoteRef>,
    pub xattrs: Option<HashMap<String, Vec<u8>>>,
}

impl Inode {
    /// Fresh directory, link count 2 for `.` and the parent entry.
    pub fn directory(mode: u32, when: SystemTime) -> Self {
        Inode {
            kind: InodeKind::Directory,
            mode,
            nlink: 2,
            size: 0,
            atime: when,
            mtime: when,
            ctime: when,
            uid: None,
            gid: None,
            remote: None,
            xattrs: None,
        }
    }

    /// Fresh empty regular file.
    pub fn regular_file(mode: u32, when: SystemTime) -> Self {
        Inode {
            kind: InodeKind::RegularFile,
            mode,
            nlink: 1,
            size: 0,
            atime: when,
            mtime: when,
            ctime: when,
            uid: None,
            gid: None,
            remote: None,
            xattrs: None,
        }
    }

    /// Fresh symbolic link; `target_len` is the byte length of the link text.
    pub fn symlink(target_len: u64, when: SystemTime) -> Self {
        Inode {
            kind: InodeKind::Symlink,
            mode: 0o777,
            nlink: 1,
            size: target_len,
            atime: when,
            mtime: when,
            ctime: when,
            uid: None,
            gid: None,
            remote: None,
            xattrs: None,
        }
    }

    pub fn with_remote(mut self, remote: RemoteRef) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == InodeKind::Directory
    }

    pub fn share_name(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.share_name.as_str())
    }

    pub fn xattrs_mut(&mut self) -> &mut HashMap<String, Vec<u8>> {
        self.xattrs.get_or_insert_with(HashMap::new)
    }

    /// Attribute snapshot for the FUSE layer.
    pub fn stat(&self) -> FileStat {
        FileStat {
            kind: self.kind,
            mode: self.mode,
            nlink: self.nlink,
            size: self.size,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            uid: self.uid,
            gid: self.gid,
        }
    }
}

/// Flattened attribute view handed across the engine boundary, keeping
/// remote refs and xattrs internal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub kind: InodeKind,
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// Seconds-since-epoch as the Ge.tt API reports creation times.
pub fn time_from_epoch(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}
