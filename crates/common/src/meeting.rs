//! Meeting and guest records as returned by the meeting registry

use serde::{Deserialize, Serialize};

/// A meeting as described by the registry
///
/// The registry returns more fields than this (guest and file lists, creation
/// time); they are not needed to run a session and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub uid: String,
    pub title: String,
    pub host_uid: String,
    pub host_fullname: String,
    /// Access password guests present to join
    pub password: String,
    /// Only meaningful for the host; authorizes ending the meeting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

/// A guest registered in a meeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub uid: String,
    pub meeting_uid: String,
    pub fullname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_ignores_extra_registry_fields() {
        let json = r#"{
            "uid": "abc1",
            "title": "Standup",
            "host_uid": "h001",
            "host_fullname": "Alice",
            "password": "9599",
            "secret_key": "s3cr",
            "guests": [],
            "files": [],
            "created_at": "Mon, 01 Jan 2024 10:00:00 GMT"
        }"#;

        let meeting: Meeting = serde_json::from_str(json).unwrap();
        assert_eq!(meeting.uid, "abc1");
        assert_eq!(meeting.secret_key.as_deref(), Some("s3cr"));
    }

    #[test]
    fn test_meeting_without_secret_key() {
        let json = r#"{"uid":"abc1","title":"t","host_uid":"h","host_fullname":"Alice","password":"p"}"#;
        let meeting: Meeting = serde_json::from_str(json).unwrap();
        assert!(meeting.secret_key.is_none());
    }
}
