//! Serde models for the Ge.tt REST API.

use serde::{Deserialize, Serialize};

/// Body of `POST /1/users/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub apikey: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login: session token plus account details.
#[derive(Debug, Deserialize, Clone)]
pub struct LoginResponse {
    pub accesstoken: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserInfo {
    pub storage: StorageQuota,
}

/// Byte-granular storage accounting for the account.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct StorageQuota {
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub limit: u64,
}

/// One share as returned by `GET /1/shares`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShareInfo {
    pub sharename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub files: Vec<RemoteFileInfo>,
}

impl ShareInfo {
    /// Directory name the share appears under: the title when the share has
    /// one, otherwise the share name.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.sharename)
    }
}

/// One file inside a share listing.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RemoteFileInfo {
    pub filename: String,
    pub fileid: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: i64,
}

/// Body of `POST /1/shares/create`.
#[derive(Debug, Serialize)]
pub struct CreateShareRequest<'a> {
    pub title: &'a str,
}

/// Everything captured from the account at mount time.
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub quota: StorageQuota,
    pub shares: Vec<ShareInfo>,
}
