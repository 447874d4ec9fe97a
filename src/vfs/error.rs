//! Failure modes of the virtual filesystem engine.

use thiserror::Error;

/// Everything that can go wrong inside the engine.
///
/// The two remote variants wrap whatever the Ge.tt client reported; the FUSE
/// layer flattens all variants to an errno via [`VfsError::errno`].
#[derive(Error, Debug)]
pub enum VfsError {
    #[error("no entry at {0}")]
    NotFound(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("{0} is not a symbolic link")]
    NotASymlink(String),

    #[error("operation not permitted on {0}")]
    NotPermitted(String),

    #[error("remote share operation failed: {0:#}")]
    RemoteShare(anyhow::Error),

    #[error("remote content download failed: {0:#}")]
    RemoteContent(anyhow::Error),
}

impl VfsError {
    /// Errno the kernel should see for this failure.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::NotFound(_) => libc::ENOENT,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::NotASymlink(_) => libc::EINVAL,
            VfsError::NotPermitted(_) => libc::EPERM,
            VfsError::RemoteShare(_) | VfsError::RemoteContent(_) => libc::EIO,
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        VfsError::NotFound(path.to_string())
    }
}
