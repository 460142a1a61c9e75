use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use url::Url;

use super::{Acknowledged, ApiError, ApiRequest};

/// Publish a file to the room
///
/// The registry works out the author's display name from `author_uid` and
/// broadcasts `new file` to everyone else.
#[derive(Debug, Clone)]
pub struct UploadFileRequest {
    pub meeting_uid: String,
    pub author_uid: String,
    pub filename: String,
    pub content: Vec<u8>,
}

impl ApiRequest for UploadFileRequest {
    type Response = Acknowledged;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!("/meetings/{}/files/upload", self.meeting_uid))?;
        let form = Form::new().part("file", Part::bytes(self.content).file_name(self.filename));

        Ok(client
            .post(full_url)
            .query(&[("author_uid", self.author_uid.as_str())])
            .multipart(form))
    }
}

#[derive(Debug, Clone)]
pub struct DeletePublicFileRequest {
    pub meeting_uid: String,
    pub filename: String,
    pub secret_key: String,
}

impl ApiRequest for DeletePublicFileRequest {
    type Response = Acknowledged;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!(
            "/meetings/{}/files/public/delete",
            self.meeting_uid
        ))?;
        Ok(client.delete(full_url).query(&[
            ("filename", self.filename.as_str()),
            ("secret_key", self.secret_key.as_str()),
        ]))
    }
}

#[derive(Debug, Clone)]
pub struct DeleteGuestFileRequest {
    pub meeting_uid: String,
    pub filename: String,
    pub password: String,
    pub author_uid: String,
}

impl ApiRequest for DeleteGuestFileRequest {
    type Response = Acknowledged;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!(
            "/meetings/{}/files/guests/delete",
            self.meeting_uid
        ))?;
        Ok(client.delete(full_url).query(&[
            ("filename", self.filename.as_str()),
            ("password", self.password.as_str()),
            ("author_uid", self.author_uid.as_str()),
        ]))
    }
}
