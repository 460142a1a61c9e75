use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use common::{Role, SessionCredentials};

use super::error::ApiError;
use super::files::{DeleteGuestFileRequest, DeletePublicFileRequest, UploadFileRequest};
use super::meetings::{EndMeetingRequest, LeaveMeetingRequest};
use super::{ApiRequest, MeetingRegistry};

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        Self::with_timeout(remote, None)
    }

    /// Client whose requests fail after `timeout` instead of hanging
    pub fn with_timeout(remote: &Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(default_headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            remote: remote.clone(),
            client: builder.build()?,
        })
    }

    /// Send a request and decode the registry's reply
    ///
    /// The registry reports most failures as a 200 with an `error` field, so
    /// the body is checked for one before decoding the expected response.
    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client)?;
        let response = request_builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?));
        }

        let body: serde_json::Value = response.json().await?;
        if let Some(message) = body.get("error") {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            return Err(ApiError::Registry(message));
        }

        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl MeetingRegistry for ApiClient {
    async fn leave(&self, creds: &SessionCredentials) -> Result<(), ApiError> {
        let guest_uid = creds
            .guest_uid
            .clone()
            .ok_or(ApiError::MissingCredential("guest uid"))?;

        self.call(LeaveMeetingRequest {
            meeting_uid: creds.meeting_uid.clone(),
            guest_uid,
        })
        .await?;
        Ok(())
    }

    async fn end(&self, creds: &SessionCredentials) -> Result<(), ApiError> {
        let secret_key = creds
            .secret_key
            .clone()
            .ok_or(ApiError::MissingCredential("secret key"))?;

        self.call(EndMeetingRequest {
            meeting_uid: creds.meeting_uid.clone(),
            secret_key,
        })
        .await?;
        Ok(())
    }

    async fn upload(&self, creds: &SessionCredentials, path: &Path) -> Result<(), ApiError> {
        let author_uid = creds
            .author_uid()
            .ok_or(ApiError::MissingCredential("author uid"))?
            .to_string();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ApiError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                ))
            })?;
        let content = tokio::fs::read(path).await?;

        self.call(UploadFileRequest {
            meeting_uid: creds.meeting_uid.clone(),
            author_uid,
            filename,
            content,
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, creds: &SessionCredentials, filename: &str) -> Result<(), ApiError> {
        match creds.role {
            Role::Host => {
                let secret_key = creds
                    .secret_key
                    .clone()
                    .ok_or(ApiError::MissingCredential("secret key"))?;
                self.call(DeletePublicFileRequest {
                    meeting_uid: creds.meeting_uid.clone(),
                    filename: filename.to_string(),
                    secret_key,
                })
                .await?;
            }
            Role::Guest => {
                let author_uid = creds
                    .guest_uid
                    .clone()
                    .ok_or(ApiError::MissingCredential("guest uid"))?;
                self.call(DeleteGuestFileRequest {
                    meeting_uid: creds.meeting_uid.clone(),
                    filename: filename.to_string(),
                    password: creds.access_password.clone(),
                    author_uid,
                })
                .await?;
            }
        }
        Ok(())
    }
}
