#![allow(dead_code)]
//! Scripted stand-in for the Ge.tt API, covering both remote roles the
//! engine talks to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gett_fuse::gett_service::client::{RemoteContentSource, RemoteShareClient};

/// Scripted responses and failure switches.
#[derive(Default)]
pub struct MockResponses {
    /// Blob bytes served by `fetch_content`, keyed by `(share name, file id)`.
    blobs: HashMap<(String, String), Vec<u8>>,
    /// Operations that fail instead of returning their scripted result.
    should_fail_operations: Vec<String>,
    /// Artificial latency for `fetch_content`, to widen interleavings.
    fetch_delay: Option<Duration>,
    /// Titles passed to successful `create_share` calls, in order.
    created_titles: Vec<String>,
    /// Share names passed to successful `destroy_share` calls, in order.
    destroyed_shares: Vec<String>,
}

/// Mock remote with injectable responses and call tracking.
pub struct MockRemote {
    responses: Arc<Mutex<MockResponses>>,
    call_counter: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockRemote {
    pub fn new() -> Self {
        MockRemote {
            responses: Arc::new(Mutex::new(MockResponses::default())),
            call_counter: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Mock where every remote operation fails.
    pub fn with_failure() -> Self {
        let responses = MockResponses {
            should_fail_operations: vec![
                "create_share".to_string(),
                "destroy_share".to_string(),
                "fetch_content".to_string(),
            ],
            ..MockResponses::default()
        };
        MockRemote {
            responses: Arc::new(Mutex::new(responses)),
            call_counter: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Script the blob served for one remote file.
    pub fn set_blob(&self, share_name: &str, file_id: &str, data: &[u8]) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .blobs
            .insert((share_name.to_string(), file_id.to_string()), data.to_vec());
    }

    /// Make a specific operation fail.
    pub fn make_operation_fail(&self, operation: &str) {
        let mut responses = self.responses.lock().unwrap();
        if !responses.should_fail_operations.contains(&operation.to_string()) {
            responses.should_fail_operations.push(operation.to_string());
        }
    }

    /// Make all operations succeed again.
    pub fn clear_operation_failures(&self) {
        let mut responses = self.responses.lock().unwrap();
        responses.should_fail_operations.clear();
    }

    /// Delay every `fetch_content` call by `delay`.
    pub fn set_fetch_delay(&self, delay: Duration) {
        let mut responses = self.responses.lock().unwrap();
        responses.fetch_delay = Some(delay);
    }

    /// Get call count for a specific operation.
    pub fn get_call_count(&self, operation: &str) -> usize {
        let counter = self.call_counter.lock().unwrap();
        counter.get(operation).copied().unwrap_or(0)
    }

    /// Titles of shares created so far, in call order.
    pub fn created_titles(&self) -> Vec<String> {
        self.responses.lock().unwrap().created_titles.clone()
    }

    /// Names of shares destroyed so far, in call order.
    pub fn destroyed_shares(&self) -> Vec<String> {
        self.responses.lock().unwrap().destroyed_shares.clone()
    }

    /// Increment the call counter and report whether the operation is
    /// scripted to fail.
    fn should_fail_operation(&self, operation: &str) -> bool {
        {
            let mut counter = self.call_counter.lock().unwrap();
            *counter.entry(operation.to_string()).or_insert(0) += 1;
        }

        let responses = self.responses.lock().unwrap();
        responses.should_fail_operations.contains(&operation.to_string())
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteShareClient for MockRemote {
    async fn create_share(&self, title: &str) -> Result<()> {
        if self.should_fail_operation("create_share") {
            Err(anyhow!("mock create_share failure"))
        } else {
            let mut responses = self.responses.lock().unwrap();
            responses.created_titles.push(title.to_string());
            Ok(())
        }
    }

    async fn destroy_share(&self, share_name: &str) -> Result<()> {
        if self.should_fail_operation("destroy_share") {
            Err(anyhow!("mock destroy_share failure"))
        } else {
            let mut responses = self.responses.lock().unwrap();
            responses.destroyed_shares.push(share_name.to_string());
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteContentSource for MockRemote {
    async fn fetch_content(&self, share_name: &str, file_id: &str) -> Result<Vec<u8>> {
        if self.should_fail_operation("fetch_content") {
            return Err(anyhow!("mock fetch_content failure"));
        }

        let delay = self.responses.lock().unwrap().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let responses = self.responses.lock().unwrap();
        responses
            .blobs
            .get(&(share_name.to_string(), file_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no blob scripted for {}/{}", share_name, file_id))
    }
}
