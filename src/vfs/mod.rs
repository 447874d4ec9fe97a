//! Path-keyed virtual filesystem engine.
//!
//! All metadata lives in a flat map from absolute path to [`inode::Inode`];
//! file content lives in a parallel map of byte buffers. [`engine::GettVfs`]
//! ties the two together and talks to the remote service through the traits
//! in [`crate::gett_service::client`].

pub mod content;
pub mod directory;
pub mod engine;
pub mod error;
pub mod inode;
pub mod path_store;
