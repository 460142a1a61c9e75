//! In-memory stand-ins for the room server, the mount helper and the registry
//!
//! Every fake appends to a shared [`Journal`] so tests can assert on the order
//! in which the session touched the outside world.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use common::protocol::{InboundEvent, OutboundEvent};
use common::{CredentialStore, Guest, Meeting, SessionCredentials};
use roomdrop_daemon::mount::{MountStatus, MountTarget, Mounter};
use roomdrop_daemon::registry::{ApiError, MeetingRegistry};
use roomdrop_daemon::session::{ChannelError, Connector, EventChannel, UiEvent};
use roomdrop_daemon::{SessionCommand, SessionController, SessionDeps};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    /// Position of the first `entry`; panics if absent
    pub fn position(&self, entry: &str) -> usize {
        let entries = self.entries();
        entries
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{} not in journal {:?}", entry, entries))
    }
}

// room

/// The server's end of one client connection
pub struct RoomConnection {
    pub to_client: flume::Sender<InboundEvent>,
    pub from_client: flume::Receiver<OutboundEvent>,
}

impl RoomConnection {
    pub fn push(&self, event: InboundEvent) {
        self.to_client.send(event).unwrap();
    }

    pub async fn next_sent(&self) -> OutboundEvent {
        tokio::time::timeout(WAIT, self.from_client.recv_async())
            .await
            .expect("timed out waiting for an outbound event")
            .expect("client hung up")
    }
}

pub struct FakeChannel {
    inbound: flume::Receiver<InboundEvent>,
    outbound: flume::Sender<OutboundEvent>,
    journal: Journal,
}

#[async_trait]
impl EventChannel for FakeChannel {
    async fn send(&mut self, event: &OutboundEvent) -> Result<(), ChannelError> {
        self.journal.record(format!("send:{}", event.name()));
        self.outbound
            .send(event.clone())
            .map_err(|_| ChannelError::Disconnected("room hung up".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<InboundEvent, ChannelError>> {
        self.inbound.recv_async().await.ok().map(Ok)
    }

    async fn close(&mut self) {
        self.journal.record("close");
    }
}

#[derive(Clone)]
pub struct FakeConnector {
    accepted: flume::Sender<RoomConnection>,
    failures: Arc<AtomicUsize>,
    journal: Journal,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn EventChannel>, ChannelError> {
        if take_failure(&self.failures) {
            self.journal.record("connect:failed");
            return Err(ChannelError::Connect("connection refused".to_string()));
        }
        self.journal.record("connect");

        let (to_client, inbound) = flume::unbounded();
        let (outbound, from_client) = flume::unbounded();
        let _ = self.accepted.send(RoomConnection {
            to_client,
            from_client,
        });

        Ok(Box::new(FakeChannel {
            inbound,
            outbound,
            journal: self.journal.clone(),
        }))
    }
}

/// Hands out the server side of every connection a client opens
pub struct FakeRoom {
    accepted: flume::Receiver<RoomConnection>,
}

impl FakeRoom {
    pub async fn accept(&self) -> RoomConnection {
        tokio::time::timeout(WAIT, self.accepted.recv_async())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }
}

pub fn fake_room(journal: &Journal) -> (FakeRoom, FakeConnector) {
    let (accepted_tx, accepted_rx) = flume::unbounded();
    (
        FakeRoom {
            accepted: accepted_rx,
        },
        FakeConnector {
            accepted: accepted_tx,
            failures: Arc::new(AtomicUsize::new(0)),
            journal: journal.clone(),
        },
    )
}

impl FakeConnector {
    pub fn fail_next(&self, times: usize) {
        self.failures.store(times, Ordering::SeqCst);
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// mount helper

#[derive(Clone)]
pub struct FakeMounter {
    failures: Arc<AtomicUsize>,
    journal: Journal,
}

impl FakeMounter {
    pub fn new(journal: &Journal) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(0)),
            journal: journal.clone(),
        }
    }

    pub fn fail_next(&self, times: usize) {
        self.failures.store(times, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mounter for FakeMounter {
    async fn mount(&self, _target: &MountTarget) -> MountStatus {
        if take_failure(&self.failures) {
            self.journal.record("mount:failed");
            return MountStatus::Failure("fuse: device not found".to_string());
        }
        self.journal.record("mount");
        MountStatus::Success
    }

    async fn unmount(&self, _virtual_mountpoint: &Path) {
        self.journal.record("unmount");
    }
}

// registry

#[derive(Clone)]
pub struct FakeRegistry {
    failures: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
    upload_gate: Option<Arc<Semaphore>>,
    journal: Journal,
}

impl FakeRegistry {
    pub fn new(journal: &Journal) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(0)),
            gate: None,
            upload_gate: None,
            journal: journal.clone(),
        }
    }

    /// Leave/end calls block until the returned semaphore gets a permit
    pub fn gated(journal: &Journal) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut registry = Self::new(journal);
        registry.gate = Some(gate.clone());
        (registry, gate)
    }

    /// Uploads block until the returned semaphore gets a permit
    pub fn gated_uploads(journal: &Journal) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut registry = Self::new(journal);
        registry.upload_gate = Some(gate.clone());
        (registry, gate)
    }

    /// Make the next leave/end calls fail
    pub fn fail_next(&self, times: usize) {
        self.failures.store(times, Ordering::SeqCst);
    }

    async fn close_call(&self, name: &str) -> Result<(), ApiError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if take_failure(&self.failures) {
            self.journal.record(format!("registry:{}:failed", name));
            return Err(ApiError::Registry("Meeting not found".to_string()));
        }
        self.journal.record(format!("registry:{}", name));
        Ok(())
    }
}

#[async_trait]
impl MeetingRegistry for FakeRegistry {
    async fn leave(&self, _creds: &SessionCredentials) -> Result<(), ApiError> {
        self.close_call("leave").await
    }

    async fn end(&self, _creds: &SessionCredentials) -> Result<(), ApiError> {
        self.close_call("end").await
    }

    async fn upload(&self, _creds: &SessionCredentials, path: &Path) -> Result<(), ApiError> {
        let name = path.file_name().unwrap().to_string_lossy();
        self.journal.record(format!("registry:upload:{}", name));
        if let Some(gate) = &self.upload_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.journal.record(format!("registry:uploaded:{}", name));
        Ok(())
    }

    async fn delete(&self, _creds: &SessionCredentials, filename: &str) -> Result<(), ApiError> {
        self.journal.record(format!("registry:delete:{}", filename));
        Ok(())
    }
}

// sessions

pub fn meeting() -> Meeting {
    Meeting {
        uid: "m42".to_string(),
        title: "Standup".to_string(),
        host_uid: "h001".to_string(),
        host_fullname: "Alice".to_string(),
        password: "9599".to_string(),
        secret_key: Some("s3cr3t".to_string()),
    }
}

pub fn host_credentials(dir: &Path) -> SessionCredentials {
    SessionCredentials::for_host(&meeting(), dir.join("alice-local"), dir.join("alice-mnt"))
}

pub fn guest_credentials(dir: &Path, name: &str) -> SessionCredentials {
    let guest = Guest {
        uid: format!("g-{}", name.to_lowercase()),
        meeting_uid: "m42".to_string(),
        fullname: name.to_string(),
    };
    let slug = name.to_lowercase();
    SessionCredentials::for_guest(
        &meeting(),
        &guest,
        dir.join(format!("{}-local", slug)),
        dir.join(format!("{}-mnt", slug)),
    )
}

/// A session wired to fakes, running on its own task
pub struct Harness {
    pub journal: Journal,
    pub room: FakeRoom,
    pub connector: FakeConnector,
    pub mounter: FakeMounter,
    pub commands: flume::Sender<SessionCommand>,
    pub ui: flume::Receiver<UiEvent>,
    pub store: CredentialStore,
    pub root: PathBuf,
    pub task: tokio::task::JoinHandle<Result<(), roomdrop_daemon::lifecycle::ControllerError>>,
}

pub struct HarnessBuilder {
    creds: SessionCredentials,
    credentials_dir: PathBuf,
    journal: Journal,
    registry: Option<FakeRegistry>,
    mounter: Option<Arc<dyn Mounter>>,
    mount_failures: usize,
    connect_failures: usize,
}

impl HarnessBuilder {
    pub fn new(creds: SessionCredentials, credentials_dir: &Path) -> Self {
        Self {
            creds,
            credentials_dir: credentials_dir.to_path_buf(),
            journal: Journal::default(),
            registry: None,
            mounter: None,
            mount_failures: 0,
            connect_failures: 0,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn registry(mut self, registry: FakeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Mount with `mounter` instead of the recording fake
    pub fn mounter(mut self, mounter: Arc<dyn Mounter>) -> Self {
        self.mounter = Some(mounter);
        self
    }

    pub fn mount_failures(mut self, times: usize) -> Self {
        self.mount_failures = times;
        self
    }

    pub fn connect_failures(mut self, times: usize) -> Self {
        self.connect_failures = times;
        self
    }

    pub fn start(self) -> Harness {
        let journal = self.journal;
        let (room, connector) = fake_room(&journal);
        connector.fail_next(self.connect_failures);
        let mounter = FakeMounter::new(&journal);
        mounter.fail_next(self.mount_failures);
        let registry = self.registry.unwrap_or_else(|| FakeRegistry::new(&journal));

        let store = CredentialStore::for_role(&self.credentials_dir, self.creds.role);
        store.save(&self.creds).unwrap();

        let deps = SessionDeps {
            mounter: self
                .mounter
                .unwrap_or_else(|| Arc::new(mounter.clone())),
            connector: Arc::new(connector.clone()),
            registry: Arc::new(registry),
        };
        let (ui_tx, ui_rx) = flume::unbounded();
        let (commands_tx, commands_rx) = flume::unbounded();
        let root = self.creds.local_mountpoint.clone();

        let controller = SessionController::new(
            self.creds,
            store.clone(),
            deps,
            Arc::new(ui_tx),
            Duration::from_millis(50),
        );
        let task = tokio::spawn(controller.run(commands_rx));

        Harness {
            journal,
            room,
            connector,
            mounter,
            commands: commands_tx,
            ui: ui_rx,
            store,
            root,
            task,
        }
    }
}

impl Harness {
    pub fn send(&self, command: SessionCommand) {
        self.commands.send(command).unwrap();
    }

    /// Drain UI events until one matches
    pub async fn wait_for<F>(&self, mut predicate: F) -> UiEvent
    where
        F: FnMut(&UiEvent) -> bool,
    {
        let wait = async {
            loop {
                let event = self.ui.recv_async().await.expect("session dropped its UI");
                if predicate(&event) {
                    return event;
                }
            }
        };
        tokio::time::timeout(WAIT, wait)
            .await
            .expect("timed out waiting for a UI event")
    }

    pub async fn wait_active(&self) {
        self.wait_for(|e| {
            matches!(
                e,
                UiEvent::LifecycleChanged {
                    to: roomdrop_daemon::lifecycle::LifecycleState::Active,
                    ..
                }
            )
        })
        .await;
    }

    /// Wait for the session task to finish
    pub async fn finished(self) -> Journal {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("session did not end")
            .expect("session task panicked")
            .expect("session failed");
        self.journal
    }
}

/// Poll until `condition` holds
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition never held")
}
