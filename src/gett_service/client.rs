use crate::gett_service::http_client::HttpClient;
use crate::gett_service::models::{
    CreateShareRequest, LoginRequest, LoginResponse, ShareInfo, StorageQuota,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::RwLock;
use url::Url;

/// Remote side of share lifecycle operations (mkdir/rmdir).
#[async_trait]
pub trait RemoteShareClient: Send + Sync {
    async fn create_share(&self, title: &str) -> Result<()>;
    async fn destroy_share(&self, share_name: &str) -> Result<()>;
}

/// Remote side of lazy file content loading.
#[async_trait]
pub trait RemoteContentSource: Send + Sync {
    async fn fetch_content(&self, share_name: &str, file_id: &str) -> Result<Vec<u8>>;
}

/// Ge.tt API client.
///
/// Login stores the access token; every authenticated call appends it as the
/// `accesstoken` query parameter. Blob downloads need no token.
pub struct GettClient {
    http_client: HttpClient,
    access_token: RwLock<Option<String>>,
}

impl GettClient {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
            access_token: RwLock::new(None),
        }
    }

    /// Exchange apikey + credentials for a session token and the account's
    /// storage quota. Must succeed before any other call.
    pub async fn login(&self, apikey: &str, email: &str, password: &str) -> Result<StorageQuota> {
        let body = LoginRequest {
            apikey,
            email,
            password,
        };
        let resp: LoginResponse = self
            .http_client
            .post_json("/users/login", &body)
            .await
            .context("Ge.tt login failed")?;

        info!(
            "logged in to Ge.tt, {} of {} bytes used",
            resp.user.storage.used, resp.user.storage.limit
        );
        *self.access_token.write().await = Some(resp.accesstoken);
        Ok(resp.user.storage)
    }

    /// All shares of the account, files included.
    pub async fn list_shares(&self) -> Result<Vec<ShareInfo>> {
        let url = self.authed_url("/shares").await?;
        let shares: Vec<ShareInfo> = self
            .http_client
            .get_json(&url)
            .await
            .context("Failed to list shares")?;
        info!("listed {} shares", shares.len());
        Ok(shares)
    }

    pub async fn create_share(&self, title: &str) -> Result<()> {
        let url = self.authed_url("/shares/create").await?;
        let body = CreateShareRequest { title };
        self.http_client
            .post_status(&url, &body)
            .await
            .with_context(|| format!("Failed to create share '{}'", title))?;
        info!("created share titled '{}'", title);
        Ok(())
    }

    pub async fn destroy_share(&self, share_name: &str) -> Result<()> {
        let url = self.authed_url(&destroy_path(share_name)).await?;
        self.http_client
            .post_empty(&url)
            .await
            .with_context(|| format!("Failed to destroy share '{}'", share_name))?;
        info!("destroyed share '{}'", share_name);
        Ok(())
    }

    pub async fn fetch_content(&self, share_name: &str, file_id: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http_client
            .get_bytes(&blob_path(share_name, file_id))
            .await
            .with_context(|| format!("Failed to download {}/{}", share_name, file_id))?;
        debug!(
            "downloaded {} bytes from {}/{}",
            bytes.len(),
            share_name,
            file_id
        );
        Ok(bytes)
    }

    /// Append the stored access token to an API path.
    async fn authed_url(&self, path: &str) -> Result<String> {
        let token = self.token().await?;
        let mut url = Url::parse(&self.http_client.full_url(path))?;
        url.query_pairs_mut().append_pair("accesstoken", &token);
        Ok(url.to_string())
    }

    async fn token(&self) -> Result<String> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("not logged in"))
    }
}

impl Default for GettClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShareClient for GettClient {
    async fn create_share(&self, title: &str) -> Result<()> {
        self.create_share(title).await
    }

    async fn destroy_share(&self, share_name: &str) -> Result<()> {
        self.destroy_share(share_name).await
    }
}

#[async_trait]
impl RemoteContentSource for GettClient {
    async fn fetch_content(&self, share_name: &str, file_id: &str) -> Result<Vec<u8>> {
        self.fetch_content(share_name, file_id).await
    }
}

fn destroy_path(share_name: &str) -> String {
    format!("/shares/{}/destroy", urlencoding::encode(share_name))
}

fn blob_path(share_name: &str, file_id: &str) -> String {
    format!(
        "/files/{}/{}/blob",
        urlencoding::encode(share_name),
        urlencoding::encode(file_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path() {
        assert_eq!(blob_path("29EkEm2", "0"), "/files/29EkEm2/0/blob");
    }

    #[test]
    fn test_blob_path_encodes_segments() {
        assert_eq!(
            blob_path("my share", "a/b"),
            "/files/my%20share/a%2Fb/blob"
        );
    }

    #[test]
    fn test_destroy_path() {
        assert_eq!(destroy_path("29EkEm2"), "/shares/29EkEm2/destroy");
    }

    #[tokio::test]
    async fn test_authed_calls_require_login() {
        let client = GettClient::new();
        let err = client.create_share("title").await.unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }
}
