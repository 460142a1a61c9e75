use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::{Guest, Meeting};

use super::{Acknowledged, ApiError, ApiRequest};

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct CreateMeetingRequest {
    /// Your name, as shown to guests
    #[arg(long)]
    pub fullname: String,
    /// Meeting title
    #[arg(long)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetingResponse {
    pub meeting: Meeting,
}

impl ApiRequest for CreateMeetingRequest {
    type Response = CreateMeetingResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/meetings/new")?;
        Ok(client.post(full_url).json(&self))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct JoinMeetingRequest {
    /// Meeting uid, as shared by the host
    #[arg(long)]
    pub uid: String,
    /// Meeting access password
    #[arg(long = "password")]
    pub pwd: String,
    /// Your name, as shown to the host
    #[arg(long)]
    pub fullname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinMeetingResponse {
    pub guest: Guest,
    pub meeting: Meeting,
}

impl ApiRequest for JoinMeetingRequest {
    type Response = JoinMeetingResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/meetings/join")?;
        Ok(client.get(full_url).query(&[
            ("uid", self.uid.as_str()),
            ("pwd", self.pwd.as_str()),
            ("fullname", self.fullname.as_str()),
        ]))
    }
}

#[derive(Debug, Clone)]
pub struct LeaveMeetingRequest {
    pub meeting_uid: String,
    pub guest_uid: String,
}

impl ApiRequest for LeaveMeetingRequest {
    type Response = Acknowledged;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!(
            "/meetings/{}/guests/{}/leave",
            self.meeting_uid, self.guest_uid
        ))?;
        Ok(client.delete(full_url))
    }
}

#[derive(Debug, Clone)]
pub struct EndMeetingRequest {
    pub meeting_uid: String,
    pub secret_key: String,
}

impl ApiRequest for EndMeetingRequest {
    type Response = Acknowledged;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!("/meetings/{}/end", self.meeting_uid))?;
        Ok(client
            .delete(full_url)
            .query(&[("secret_key", self.secret_key.as_str())]))
    }
}
