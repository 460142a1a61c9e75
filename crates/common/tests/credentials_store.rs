//! Integration tests for the cross-process credential hand-off

use std::path::PathBuf;

use common::{CredentialError, CredentialStore, Guest, Meeting, Role, SessionCredentials};
use tempfile::TempDir;

fn sample_meeting() -> Meeting {
    Meeting {
        uid: "abc123".to_string(),
        title: "Standup".to_string(),
        host_uid: "h001".to_string(),
        host_fullname: "Alice".to_string(),
        password: "xxxx".to_string(),
        secret_key: Some("k3y".to_string()),
    }
}

fn guest_credentials() -> SessionCredentials {
    let guest = Guest {
        uid: "g001".to_string(),
        meeting_uid: "abc123".to_string(),
        fullname: "Bob".to_string(),
    };
    SessionCredentials::for_guest(
        &sample_meeting(),
        &guest,
        PathBuf::from("/var/roomdrop/abc123/guest"),
        PathBuf::from("/home/bob/Roomdrop/Standup"),
    )
}

#[test]
fn test_save_then_load_from_another_handle() {
    let dir = TempDir::new().unwrap();
    let writer = CredentialStore::for_role(dir.path(), Role::Guest);
    let creds = guest_credentials();

    writer.save(&creds).unwrap();

    // a second process only knows the well-known location
    let reader = CredentialStore::for_role(dir.path(), Role::Guest);
    assert!(reader.exists());
    assert_eq!(reader.load().unwrap(), creds);

    // the other role has no session
    let host = CredentialStore::for_role(dir.path(), Role::Host);
    assert!(!host.exists());
}

#[test]
fn test_load_missing_session() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::for_role(dir.path(), Role::Host);

    match store.load() {
        Err(CredentialError::MissingSession(path)) => assert_eq!(path, store.path()),
        other => panic!("expected MissingSession, got {:?}", other),
    }
}

#[test]
fn test_load_corrupt_session() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::for_role(dir.path(), Role::Host);
    std::fs::write(store.path(), b"{\"role\": \"host\", \"meeting_uid\": ").unwrap();

    assert!(matches!(
        store.load(),
        Err(CredentialError::CorruptSession { .. })
    ));
}

#[test]
fn test_clear_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::for_role(dir.path(), Role::Guest);
    store.save(&guest_credentials()).unwrap();

    store.clear().unwrap();
    assert!(!store.exists());

    // already gone
    store.clear().unwrap();
    assert!(matches!(
        store.load(),
        Err(CredentialError::MissingSession(_))
    ));
}

#[test]
fn test_save_overwrites_previous_record() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::for_role(dir.path(), Role::Guest);

    let mut creds = guest_credentials();
    store.save(&creds).unwrap();

    creds.title = "Retro".to_string();
    store.save(&creds).unwrap();

    assert_eq!(store.load().unwrap().title, "Retro");
    // no temp file left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_record_schema_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::for_role(dir.path(), Role::Guest);
    store.save(&guest_credentials()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
    assert_eq!(raw["role"], "guest");
    assert_eq!(raw["meeting_uid"], "abc123");
    assert_eq!(raw["self_fullname"], "Bob");
    assert!(raw.get("secret_key").is_none());
}
