//! fuser protocol implementation bridging kernel requests into the engine.
//!
//! FUSE callbacks arrive on the session loop thread, outside the tokio
//! runtime, so every engine call is driven to completion with
//! [`tokio::runtime::Handle::block_on`].

use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use log::debug;
use tokio::runtime::Handle;

use crate::fuse::attributes::{AttributeManager, ATTR_TTL};
use crate::fuse::inode_table::InodeTable;
use crate::vfs::engine::GettVfs;
use crate::vfs::error::VfsError;
use crate::vfs::inode::FileStat;
use crate::vfs::path_store::{join_child, parent_of};

/// Maximum file name length reported through statfs.
const NAME_MAX: u32 = 255;

/// The FUSE-facing filesystem: kernel inos and replies on one side, the
/// path-addressed async engine on the other.
pub struct GettFuse {
    vfs: Arc<GettVfs>,
    inodes: InodeTable,
    rt: Handle,
    uid: u32,
    gid: u32,
}

impl GettFuse {
    /// `rt` must belong to a runtime that outlives the mount.
    pub fn new(vfs: Arc<GettVfs>, rt: Handle) -> Self {
        GettFuse {
            vfs,
            inodes: InodeTable::new(),
            rt,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.rt.block_on(fut)
    }

    fn attr(&self, stat: &FileStat, ino: u64) -> FileAttr {
        AttributeManager::file_attr(stat, ino, self.uid, self.gid)
    }

    fn path_for(&self, ino: u64) -> Option<String> {
        self.inodes.path_of(ino).map(str::to_string)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Option<String> {
        let parent_path = self.inodes.path_of(parent)?;
        Some(join_child(parent_path, &name.to_string_lossy()))
    }
}

impl Filesystem for GettFuse {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name_str = name.to_string_lossy();
        debug!("LOOKUP: parent={}, name={}", parent, name_str);

        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.getattr(&path));
        match result {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&ATTR_TTL, &self.attr(&stat, ino), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("GETATTR: ino={}", ino);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.getattr(&path));
        match result {
            Ok(stat) => reply.attr(&ATTR_TTL, &self.attr(&stat, ino)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!("SETATTR: ino={}", ino);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Some(mode) = mode {
            if let Err(e) = self.block_on(self.vfs.chmod(&path, mode)) {
                reply.error(e.errno());
                return;
            }
        }
        if uid.is_some() || gid.is_some() {
            if let Err(e) = self.block_on(self.vfs.chown(&path, uid, gid)) {
                reply.error(e.errno());
                return;
            }
        }
        if let Some(size) = size {
            if let Err(e) = self.block_on(self.vfs.truncate(&path, size)) {
                reply.error(e.errno());
                return;
            }
        }
        if atime.is_some() || mtime.is_some() {
            let atime = atime.map(resolve_time);
            let mtime = mtime.map(resolve_time);
            if let Err(e) = self.block_on(self.vfs.utimens(&path, atime, mtime)) {
                reply.error(e.errno());
                return;
            }
        }

        let result = self.block_on(self.vfs.getattr(&path));
        match result {
            Ok(stat) => reply.attr(&ATTR_TTL, &self.attr(&stat, ino)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        debug!("READLINK: ino={}", ino);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.readlink(&path));
        match result {
            Ok(target) => reply.data(&target),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let name_str = link_name.to_string_lossy();
        debug!("SYMLINK: parent={}, name={} -> {:?}", parent, name_str, target);

        let Some(path) = self.child_path(parent, link_name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let target_str = target.to_string_lossy().into_owned();
        let result = self.block_on(async {
            self.vfs.symlink(&path, &target_str).await?;
            self.vfs.getattr(&path).await
        });
        match result {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&ATTR_TTL, &self.attr(&stat, ino), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let name_str = name.to_string_lossy();
        debug!("MKDIR: parent={}, name={}", parent, name_str);

        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(async {
            self.vfs.mkdir(&path, mode).await?;
            self.vfs.getattr(&path).await
        });
        match result {
            Ok(stat) => {
                let ino = self.inodes.ino_for(&path);
                reply.entry(&ATTR_TTL, &self.attr(&stat, ino), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name_str = name.to_string_lossy();
        debug!("UNLINK: parent={}, name={}", parent, name_str);

        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.unlink(&path));
        match result {
            Ok(()) => {
                self.inodes.forget_path(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name_str = name.to_string_lossy();
        debug!("RMDIR: parent={}, name={}", parent, name_str);

        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.rmdir(&path));
        match result {
            Ok(()) => {
                self.inodes.forget_subtree(&path);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let name_str = name.to_string_lossy();
        let newname_str = newname.to_string_lossy();
        debug!(
            "RENAME: parent={}, name={} -> newparent={}, newname={}",
            parent, name_str, newparent, newname_str
        );

        let (Some(old), Some(new)) = (
            self.child_path(parent, name),
            self.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };

        if flags & libc::RENAME_NOREPLACE != 0
            && self.block_on(self.vfs.getattr(&new)).is_ok()
        {
            reply.error(libc::EEXIST);
            return;
        }

        let result = self.block_on(self.vfs.rename(&old, &new));
        match result {
            Ok(()) => {
                self.inodes.retarget_prefix(&old, &new);
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("OPEN: ino={}, flags={:#x}", ino, flags);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.open(&path));
        match result {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!(
            "READ: ino={}, fh={}, offset={}, size={}",
            ino, fh, offset, size
        );

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.read(&path, size, offset));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!(
            "WRITE: ino={}, fh={}, offset={}, size={}",
            ino,
            fh,
            offset,
            data.len()
        );

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.write(&path, data, offset));
        match result {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn flush(&mut self, _req: &Request, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        debug!("FLUSH: ino={}", ino);
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("RELEASE: ino={}", ino);
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("READDIR: ino={}, offset={}", ino, offset);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let names = match self.block_on(self.vfs.readdir(&path)) {
            Ok(names) => names,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let parent_path = parent_of(&path).to_string();
        let mut entries: Vec<(u64, FileType, String)> = Vec::with_capacity(names.len());
        for name in names {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (self.inodes.ino_for(&parent_path), FileType::Directory),
                _ => {
                    let child = join_child(&path, &name);
                    let kind = match self.block_on(self.vfs.getattr(&child)) {
                        Ok(stat) => AttributeManager::file_type(stat.kind),
                        Err(_) => FileType::RegularFile,
                    };
                    (self.inodes.ino_for(&child), kind)
                }
            };
            entries.push((entry_ino, kind, name));
        }

        for (i, (entry_ino, kind, name)) in entries
            .into_iter()
            .enumerate()
            .skip(offset.max(0) as usize)
        {
            // i + 1 is the offset the kernel passes to resume after this entry
            if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        debug!("STATFS");

        let stats = self.vfs.statfs();
        reply.statfs(
            stats.blocks,
            stats.bfree,
            stats.bavail,
            0, // total file nodes
            0, // free file nodes
            stats.bsize,
            NAME_MAX,
            0, // fragment size
        );
    }

    fn setxattr(
        &mut self,
        _req: &Request,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        debug!("SETXATTR: ino={}, name={:?}", ino, name);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let name = name.to_string_lossy();
        let result = self.block_on(self.vfs.set_xattr(&path, &name, value));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getxattr(&mut self, _req: &Request, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        debug!("GETXATTR: ino={}, name={:?}, size={}", ino, name, size);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let name = name.to_string_lossy();
        let result = self.block_on(self.vfs.get_xattr(&path, &name));
        match result {
            Ok(value) => reply_xattr_bytes(&value, size, reply),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn listxattr(&mut self, _req: &Request, ino: u64, size: u32, reply: ReplyXattr) {
        debug!("LISTXATTR: ino={}, size={}", ino, size);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(self.vfs.list_xattr(&path));
        match result {
            Ok(names) => {
                let mut buf = Vec::new();
                for name in names {
                    buf.extend_from_slice(name.as_bytes());
                    buf.push(0);
                }
                reply_xattr_bytes(&buf, size, reply)
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn removexattr(&mut self, _req: &Request, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!("REMOVEXATTR: ino={}, name={:?}", ino, name);

        let Some(path) = self.path_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let name = name.to_string_lossy();
        let result = self.block_on(self.vfs.remove_xattr(&path, &name));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn access(&mut self, _req: &Request, ino: u64, _mask: i32, reply: ReplyEmpty) {
        debug!("ACCESS: ino={}", ino);
        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let name_str = name.to_string_lossy();
        debug!("CREATE: parent={}, name={}, mode={:o}", parent, name_str, mode);

        let Some(path) = self.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self.block_on(async {
            let fh = self.vfs.create_file(&path, mode).await?;
            let stat = self.vfs.getattr(&path).await?;
            Ok::<_, VfsError>((fh, stat))
        });
        match result {
            Ok((fh, stat)) => {
                let ino = self.inodes.ino_for(&path);
                reply.created(&ATTR_TTL, &self.attr(&stat, ino), 0, fh, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }
}

fn resolve_time(t: TimeOrNow) -> SystemTime {
    match t {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    }
}

/// getxattr/listxattr size protocol: size 0 asks for the needed length,
/// otherwise the data must fit in the caller's buffer.
fn reply_xattr_bytes(data: &[u8], size: u32, reply: ReplyXattr) {
    if size == 0 {
        reply.size(data.len() as u32);
    } else if data.len() <= size as usize {
        reply.data(data);
    } else {
        reply.error(libc::ERANGE);
    }
}
