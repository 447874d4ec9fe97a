//! File attribute conversion for the FUSE layer.

use std::time::Duration;

use fuser::{FileAttr, FileType};

use crate::vfs::inode::{FileStat, InodeKind};

/// How long the kernel may cache attributes and entries.
pub const ATTR_TTL: Duration = Duration::from_secs(1);

/// Attribute manager for the FUSE filesystem.
pub struct AttributeManager;

impl AttributeManager {
    /// Convert an engine attribute snapshot into kernel attributes under
    /// inode number `ino`. `uid`/`gid` fill in for entries never chowned.
    pub fn file_attr(stat: &FileStat, ino: u64, uid: u32, gid: u32) -> FileAttr {
        FileAttr {
            ino,
            size: stat.size,
            blocks: (stat.size + 511) / 512, // 512-byte blocks
            atime: stat.atime,
            mtime: stat.mtime,
            ctime: stat.ctime,
            crtime: stat.ctime,
            kind: Self::file_type(stat.kind),
            perm: (stat.mode & 0o7777) as u16,
            nlink: stat.nlink,
            uid: stat.uid.unwrap_or(uid),
            gid: stat.gid.unwrap_or(gid),
            rdev: 0,
            flags: 0,
            blksize: 512,
        }
    }

    pub fn file_type(kind: InodeKind) -> FileType {
        match kind {
            InodeKind::Directory => FileType::Directory,
            InodeKind::RegularFile => FileType::RegularFile,
            InodeKind::Symlink => FileType::Symlink,
        }
    }
}
