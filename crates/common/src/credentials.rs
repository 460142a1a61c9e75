//! Session credential hand-off
//!
//! The process that creates or joins a meeting writes a [`SessionCredentials`]
//! record to a well-known per-role path; the live session process reads it back.
//! Presence of the file is the only signal that a session is in progress for
//! that role.
//!
//! The file is plain JSON with no access control. Roomdrop assumes a
//! single-user machine.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::meeting::{Guest, Meeting};
use crate::role::Role;

/// Identity and connection parameters for one participant's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub role: Role,
    pub meeting_uid: String,
    pub title: String,
    pub host_fullname: String,
    pub host_uid: String,
    pub access_password: String,
    /// Host only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Backing directory the mount helper mirrors
    pub local_mountpoint: PathBuf,
    /// Where the shared tree is mounted for the user
    pub virtual_mountpoint: PathBuf,
    /// Guest only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_fullname: Option<String>,
    /// Guest only; the registry addresses leave requests by guest uid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_uid: Option<String>,
}

impl SessionCredentials {
    pub fn for_host(
        meeting: &Meeting,
        local_mountpoint: PathBuf,
        virtual_mountpoint: PathBuf,
    ) -> Self {
        Self {
            role: Role::Host,
            meeting_uid: meeting.uid.clone(),
            title: meeting.title.clone(),
            host_fullname: meeting.host_fullname.clone(),
            host_uid: meeting.host_uid.clone(),
            access_password: meeting.password.clone(),
            secret_key: meeting.secret_key.clone(),
            local_mountpoint,
            virtual_mountpoint,
            self_fullname: None,
            guest_uid: None,
        }
    }

    pub fn for_guest(
        meeting: &Meeting,
        guest: &Guest,
        local_mountpoint: PathBuf,
        virtual_mountpoint: PathBuf,
    ) -> Self {
        Self {
            role: Role::Guest,
            meeting_uid: meeting.uid.clone(),
            title: meeting.title.clone(),
            host_fullname: meeting.host_fullname.clone(),
            host_uid: meeting.host_uid.clone(),
            access_password: meeting.password.clone(),
            // guests never hold the key, even if the registry leaks it
            secret_key: None,
            local_mountpoint,
            virtual_mountpoint,
            self_fullname: Some(guest.fullname.clone()),
            guest_uid: Some(guest.uid.clone()),
        }
    }

    /// Display name of the participant owning this session
    pub fn display_name(&self) -> &str {
        match self.role {
            Role::Host => &self.host_fullname,
            Role::Guest => self.self_fullname.as_deref().unwrap_or_default(),
        }
    }

    /// Uid the registry knows this participant as (used as upload author)
    pub fn author_uid(&self) -> Option<&str> {
        match self.role {
            Role::Host => Some(&self.host_uid),
            Role::Guest => self.guest_uid.as_deref(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no session in progress: {0} does not exist")]
    MissingSession(PathBuf),
    #[error("session credentials at {path} are malformed: {source}")]
    CorruptSession {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-role credential record at a fixed path
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `role` inside `dir`, at `<dir>/<role>.credentials.json`
    pub fn for_role(dir: &Path, role: Role) -> Self {
        Self::new(dir.join(format!("{}.credentials.json", role)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist the record durably
    ///
    /// Writes to a sibling temp file and renames it into place, so a reader
    /// never observes a half-written record.
    pub fn save(&self, record: &SessionCredentials) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(record).map_err(|e| CredentialError::Io {
            path: self.path.clone(),
            source: io::Error::other(e),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
            file.write_all(&json).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        tracing::debug!("saved {} credentials to {}", record.role, self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<SessionCredentials, CredentialError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CredentialError::MissingSession(self.path.clone()));
            }
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| CredentialError::CorruptSession {
            path: self.path.clone(),
            source,
        })
    }

    /// Remove the record; removing an absent record is not an error
    pub fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("cleared credentials at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting() -> Meeting {
        Meeting {
            uid: "abc123".to_string(),
            title: "Standup".to_string(),
            host_uid: "h001".to_string(),
            host_fullname: "Alice".to_string(),
            password: "xxxx".to_string(),
            secret_key: Some("k3y".to_string()),
        }
    }

    #[test]
    fn test_guest_credentials_drop_secret_key() {
        let guest = Guest {
            uid: "g001".to_string(),
            meeting_uid: "abc123".to_string(),
            fullname: "Bob".to_string(),
        };
        let creds = SessionCredentials::for_guest(
            &meeting(),
            &guest,
            PathBuf::from("/data/abc123/guest"),
            PathBuf::from("/mnt/Standup"),
        );

        assert_eq!(creds.role, Role::Guest);
        assert!(creds.secret_key.is_none());
        assert_eq!(creds.display_name(), "Bob");
        assert_eq!(creds.author_uid(), Some("g001"));
    }

    #[test]
    fn test_host_credentials_keep_secret_key() {
        let creds = SessionCredentials::for_host(
            &meeting(),
            PathBuf::from("/data/abc123/host"),
            PathBuf::from("/mnt/Standup"),
        );

        assert_eq!(creds.secret_key.as_deref(), Some("k3y"));
        assert_eq!(creds.display_name(), "Alice");
        assert_eq!(creds.author_uid(), Some("h001"));
    }

    #[test]
    fn test_store_path_is_per_role() {
        let dir = Path::new("/tmp");
        assert_eq!(
            CredentialStore::for_role(dir, Role::Host).path(),
            Path::new("/tmp/host.credentials.json")
        );
        assert_eq!(
            CredentialStore::for_role(dir, Role::Guest).path(),
            Path::new("/tmp/guest.credentials.json")
        );
    }
}
