use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde::Serialize;

const GETT_API_BASE: &str = "http://open.ge.tt/1";

/// HTTP client for Ge.tt API operations.
///
/// Ge.tt authenticates through an `accesstoken` query parameter, so unlike
/// most REST wrappers there is no authorization header to thread through.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Get full URL by prepending the Ge.tt API base if needed.
    pub fn full_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            format!("{}{}", GETT_API_BASE, url)
        }
    }

    /// Make a GET request and deserialize the JSON response.
    pub async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.full_url(url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get response")?
            .error_for_status()
            .context("Not a success status")?;

        let response_json = response
            .json::<T>()
            .await
            .context("Failed to deserialize response")?;
        Ok(response_json)
    }

    /// Make a POST request with a JSON body and deserialize the JSON response.
    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize,
    {
        let url = self.full_url(url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to get response for post")?
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response")?;
        Ok(response)
    }

    /// Make a POST request with a JSON body, caring only about the status.
    pub async fn post_status<B>(&self, url: &str, body: &B) -> Result<()>
    where
        B: Serialize,
    {
        let url = self.full_url(url);
        debug!("POST {}", url);

        self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to get response for post")?
            .error_for_status()
            .context("Not a success status")?;
        Ok(())
    }

    /// Make a bodyless POST request, caring only about the status.
    pub async fn post_empty(&self, url: &str) -> Result<()> {
        let url = self.full_url(url);
        debug!("POST {}", url);

        self.client
            .post(&url)
            .send()
            .await
            .context("Failed to get response for post")?
            .error_for_status()
            .context("Not a success status")?;
        Ok(())
    }

    /// Download raw content.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.full_url(url);
        debug!("GET (blob) {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get response for download")?
            .error_for_status()
            .context("Not a success status")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download body")?;
        Ok(bytes.to_vec())
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
