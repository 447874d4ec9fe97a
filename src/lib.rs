//! Mount a Ge.tt file-sharing account as a local FUSE filesystem.
//!
//! Shares appear as top-level directories and the files in them download
//! lazily on the first read. All filesystem state is held in memory for the
//! lifetime of the mount; nothing persists locally.

pub mod fuse;
pub mod gett_service;
pub mod vfs;
