#![allow(dead_code)]
//! Builders for the account snapshots the engine is seeded from.

use std::sync::Arc;

use gett_fuse::gett_service::client::{RemoteContentSource, RemoteShareClient};
use gett_fuse::gett_service::models::{AccountSnapshot, RemoteFileInfo, ShareInfo, StorageQuota};
use gett_fuse::vfs::engine::GettVfs;

use super::mock_remote::MockRemote;

/// Create a test remote file entry.
pub fn remote_file(filename: &str, fileid: &str, size: u64, created: i64) -> RemoteFileInfo {
    RemoteFileInfo {
        filename: filename.to_string(),
        fileid: fileid.to_string(),
        size: Some(size),
        created,
    }
}

/// Create a test share listing.
pub fn share(
    sharename: &str,
    title: Option<&str>,
    created: i64,
    files: Vec<RemoteFileInfo>,
) -> ShareInfo {
    ShareInfo {
        sharename: sharename.to_string(),
        title: title.map(str::to_string),
        created,
        files,
    }
}

/// Create a test account snapshot.
pub fn snapshot(used: u64, limit: u64, shares: Vec<ShareInfo>) -> AccountSnapshot {
    AccountSnapshot {
        quota: StorageQuota { used, limit },
        shares,
    }
}

/// Two shares as a fresh login might list them: a titled one holding two
/// files and an untitled one holding a single file.
pub fn two_share_snapshot() -> AccountSnapshot {
    snapshot(
        4096,
        1_000_000,
        vec![
            share(
                "x1y2z3",
                Some("holiday-photos"),
                1_300_000_000,
                vec![
                    remote_file("beach.jpg", "0", 2048, 1_300_000_100),
                    remote_file("sunset.jpg", "1", 1024, 1_300_000_200),
                ],
            ),
            share(
                "a9b8c7",
                None,
                1_310_000_000,
                vec![remote_file("notes.txt", "0", 64, 1_310_000_050)],
            ),
        ],
    )
}

/// Engine seeded from `snapshot`, wired to `remote` for both the share
/// management and the content download role.
pub fn engine_with(snapshot: AccountSnapshot, remote: &Arc<MockRemote>) -> GettVfs {
    GettVfs::from_snapshot(
        snapshot,
        Arc::clone(remote) as Arc<dyn RemoteShareClient>,
        Arc::clone(remote) as Arc<dyn RemoteContentSource>,
    )
}
