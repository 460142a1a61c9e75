//! Meeting registry REST client
//!
//! Every endpoint is a request type implementing [`ApiRequest`]; [`ApiClient`]
//! sends them. The session engine only sees the [`MeetingRegistry`] trait, so
//! tests can swap the HTTP client for a fake.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use common::SessionCredentials;

mod client;
mod error;
pub mod files;
pub mod meetings;

pub use client::ApiClient;
pub use error::ApiError;

pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}

/// Calls the session engine makes against the registry on behalf of one participant
#[async_trait]
pub trait MeetingRegistry: Send + Sync {
    /// Deregister a guest
    async fn leave(&self, creds: &SessionCredentials) -> Result<(), ApiError>;

    /// End the meeting (host only, authorized by the secret key)
    async fn end(&self, creds: &SessionCredentials) -> Result<(), ApiError>;

    /// Publish a file from the participant's upload folder
    async fn upload(&self, creds: &SessionCredentials, path: &Path) -> Result<(), ApiError>;

    /// Withdraw a previously published file
    async fn delete(&self, creds: &SessionCredentials, filename: &str) -> Result<(), ApiError>;
}

/// Acknowledgement body of calls that return nothing of interest
///
/// Unknown fields (`success`, `guest`, `meeting`, ...) are ignored.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Acknowledged {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
