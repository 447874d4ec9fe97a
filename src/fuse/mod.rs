//! FUSE protocol adapter: kernel inode numbers and replies on top of the
//! path-addressed engine.

pub mod attributes;
pub mod filesystem;
pub mod inode_table;
