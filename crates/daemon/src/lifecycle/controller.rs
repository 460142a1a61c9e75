use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::MissedTickBehavior;

use common::protocol::InboundEvent;
use common::{CredentialError, CredentialStore, Role, SessionCredentials};

use super::state::{Lifecycle, LifecycleState, TransitionError};
use crate::mount::{HelperMounter, MountStatus, MountTarget, Mounter};
use crate::reconciler::{LocalChange, LocalScanner};
use crate::registry::{ApiClient, ApiError, MeetingRegistry};
use crate::session::{ChannelError, Connector, Dispatch, RealtimeSession, UiEvent, UiSink, WsConnector};
use crate::state::EngineConfig;

/// Requests from the user to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    SendMessage(String),
    /// Retry whatever step last failed (mount, join, reconnect, bootstrap)
    Retry,
    /// Leave (guest) or end (host) the meeting
    ///
    /// Without `force`, a failed registry call keeps the session running.
    Close { force: bool },
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("failed to load session: {0}")]
    Credentials(#[from] CredentialError),
    #[error("failed to set up registry client: {0}")]
    Registry(#[from] ApiError),
}

/// External collaborators of a session
#[derive(Clone)]
pub struct SessionDeps {
    pub mounter: Arc<dyn Mounter>,
    pub connector: Arc<dyn Connector>,
    pub registry: Arc<dyn MeetingRegistry>,
}

impl SessionDeps {
    /// Production collaborators: mount helper, WebSocket room, REST registry
    pub fn from_config(config: &EngineConfig) -> Result<Self, ApiError> {
        Ok(Self {
            mounter: Arc::new(HelperMounter::new(
                config.mount_helper.clone(),
                config.unmount_command.clone(),
                config.mount_timeout,
            )),
            connector: Arc::new(WsConnector::new(config.channel_url.clone())),
            registry: Arc::new(ApiClient::with_timeout(
                &config.server_url,
                Some(config.request_timeout),
            )?),
        })
    }
}

type PendingClose = BoxFuture<'static, Result<(), ApiError>>;

/// Upload or delete of a local file, tagged for reporting
type Transfer = BoxFuture<'static, (LocalChange, Result<(), ApiError>)>;

/// Runs one participant's session
///
/// Everything happens on a single task: room events, user commands, the
/// in-flight registry call of a close, and local folder scans are handled
/// one at a time in arrival order. Registry calls run as in-flight futures
/// polled by the same loop, so they never hold up room events.
pub struct SessionController {
    lifecycle: Lifecycle,
    session: RealtimeSession,
    store: CredentialStore,
    deps: SessionDeps,
    ui: Arc<dyn UiSink>,
    target: MountTarget,
    mounted: bool,
    scanner: Option<LocalScanner>,
    scan_interval: Duration,
    pending_close: Option<PendingClose>,
    close_forced: bool,
    transfers: FuturesUnordered<Transfer>,
}

impl SessionController {
    pub fn new(
        creds: SessionCredentials,
        store: CredentialStore,
        deps: SessionDeps,
        ui: Arc<dyn UiSink>,
        scan_interval: Duration,
    ) -> Self {
        let target = MountTarget::from_credentials(&creds);
        Self {
            lifecycle: Lifecycle::new(),
            session: RealtimeSession::new(creds, ui.clone()),
            store,
            deps,
            ui,
            target,
            mounted: false,
            scanner: None,
            scan_interval,
            pending_close: None,
            close_forced: false,
            transfers: FuturesUnordered::new(),
        }
    }

    /// Resume the session recorded for `role`
    pub fn resume(
        config: &EngineConfig,
        role: Role,
        ui: Arc<dyn UiSink>,
    ) -> Result<Self, ControllerError> {
        let store = CredentialStore::for_role(&config.credentials_dir, role);
        let creds = store.load()?;
        let deps = SessionDeps::from_config(config)?;
        Ok(Self::new(creds, store, deps, ui, config.scan_interval))
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn session(&self) -> &RealtimeSession {
        &self.session
    }

    /// Drive the session until it has ended
    ///
    /// If every command sender is dropped the session is closed as if a
    /// forced close had been requested.
    pub async fn run(
        mut self,
        commands: flume::Receiver<SessionCommand>,
    ) -> Result<(), ControllerError> {
        self.transition(LifecycleState::Mounting)?;
        self.try_mount().await?;

        let mut scan = tokio::time::interval(self.scan_interval);
        scan.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        while !self.state().is_terminal() {
            let active = self.state() == LifecycleState::Active;

            tokio::select! {
                incoming = self.session.recv() => self.on_incoming(incoming).await?,
                command = commands.recv_async(), if commands_open => match command {
                    Ok(command) => self.on_command(command).await?,
                    Err(_) => {
                        tracing::info!("command channel closed, ending session");
                        commands_open = false;
                        self.request_close(true).await?;
                    }
                },
                result = poll_pending(&mut self.pending_close) => self.on_close_finished(result).await?,
                Some((change, result)) = self.transfers.next(), if !self.transfers.is_empty() => {
                    self.on_transfer_finished(change, result)
                }
                _ = scan.tick(), if active => self.scan_local().await,
            }
        }

        Ok(())
    }

    fn transition(&mut self, to: LifecycleState) -> Result<(), ControllerError> {
        let from = self.lifecycle.advance(to)?;
        if from != to {
            tracing::info!("session {}: {} -> {}", self.session.credentials().meeting_uid, from, to);
            self.ui.emit(UiEvent::LifecycleChanged { from, to });
        }
        Ok(())
    }

    async fn try_mount(&mut self) -> Result<(), ControllerError> {
        match self.deps.mounter.mount(&self.target).await {
            MountStatus::Success => {
                self.mounted = true;
                self.transition(LifecycleState::Joining)?;
                self.try_join().await
            }
            MountStatus::Failure(reason) => {
                tracing::error!("mount failed: {}", reason);
                self.ui.emit(UiEvent::MountFailed { reason });
                Ok(())
            }
        }
    }

    async fn try_join(&mut self) -> Result<(), ControllerError> {
        match self.session.connect(self.deps.connector.as_ref()).await {
            Ok(()) => {
                self.transition(LifecycleState::Bootstrapping)?;
                self.bootstrap();
                self.transition(LifecycleState::Active)
            }
            Err(e) => {
                tracing::error!("failed to join the room: {}", e);
                self.ui.emit(UiEvent::ChannelLost {
                    reason: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Lay out the tree and start watching the upload folder
    fn bootstrap(&mut self) {
        let reconciler = self.session.reconciler();

        match reconciler.bootstrap_tree() {
            Ok(changes) => {
                for change in changes {
                    self.ui.emit(change.into());
                }
            }
            Err(e) => {
                tracing::warn!("failed to lay out the shared tree: {}", e);
                self.ui.emit(UiEvent::Degraded {
                    reason: e.to_string(),
                });
            }
        }

        if self.scanner.is_none() {
            match reconciler.upload_dir() {
                Ok(dir) => self.scanner = Some(LocalScanner::new(dir)),
                Err(e) => self.ui.emit(UiEvent::Degraded {
                    reason: e.to_string(),
                }),
            }
        }
    }

    async fn on_incoming(
        &mut self,
        incoming: Option<Result<InboundEvent, ChannelError>>,
    ) -> Result<(), ControllerError> {
        match incoming {
            Some(Ok(event)) => {
                if self.session.dispatch(event) == Dispatch::Ended {
                    self.ui.emit(UiEvent::MeetingEnded);
                    // the room is already gone, nothing to tell the registry
                    self.pending_close = None;
                    self.shut_down(false).await?;
                }
            }
            Some(Err(e)) if e.is_recoverable() => {
                tracing::warn!("dropping bad frame: {}", e);
            }
            Some(Err(e)) => self.channel_lost(e.to_string()),
            None => self.channel_lost("closed by the room".to_string()),
        }
        Ok(())
    }

    fn channel_lost(&mut self, reason: String) {
        tracing::error!("lost connection to the room: {}", reason);
        self.session.mark_lost();
        self.ui.emit(UiEvent::ChannelLost { reason });
    }

    async fn on_command(&mut self, command: SessionCommand) -> Result<(), ControllerError> {
        tracing::debug!("command {:?}", command);

        match command {
            SessionCommand::SendMessage(text) => {
                if let Err(e) = self.session.send_message(&text).await {
                    if e.is_recoverable() {
                        tracing::warn!("message not sent: {}", e);
                    } else if self.session.is_connected() {
                        self.channel_lost(e.to_string());
                    } else {
                        self.ui.emit(UiEvent::Degraded {
                            reason: format!("message not sent: {}", e),
                        });
                    }
                }
            }
            SessionCommand::Retry => self.retry().await?,
            SessionCommand::Close { force } => self.request_close(force).await?,
        }
        Ok(())
    }

    async fn retry(&mut self) -> Result<(), ControllerError> {
        match self.state() {
            LifecycleState::Mounting => {
                self.transition(LifecycleState::Mounting)?;
                self.try_mount().await
            }
            LifecycleState::Joining => self.try_join().await,
            LifecycleState::Active if !self.session.is_connected() => {
                match self.session.connect(self.deps.connector.as_ref()).await {
                    Ok(()) => self.bootstrap(),
                    Err(e) => self.channel_lost(e.to_string()),
                }
                Ok(())
            }
            LifecycleState::Active => {
                self.bootstrap();
                Ok(())
            }
            state => {
                tracing::debug!("nothing to retry while {}", state);
                Ok(())
            }
        }
    }

    /// Start leaving (guest) or ending (host) the meeting
    ///
    /// The registry call runs in the background; room events keep flowing
    /// until it settles.
    async fn request_close(&mut self, force: bool) -> Result<(), ControllerError> {
        if self.pending_close.is_some() {
            self.close_forced |= force;
            tracing::debug!("close already in progress");
            return Ok(());
        }
        if matches!(self.state(), LifecycleState::Ending | LifecycleState::Ended) {
            return Ok(());
        }

        self.close_forced = force;
        let registry = self.deps.registry.clone();
        let creds = self.session.credentials().clone();

        self.pending_close = Some(Box::pin(async move {
            match creds.role {
                Role::Host => registry.end(&creds).await,
                Role::Guest => registry.leave(&creds).await,
            }
        }));
        Ok(())
    }

    async fn on_close_finished(&mut self, result: Result<(), ApiError>) -> Result<(), ControllerError> {
        let operation = match self.session.credentials().role {
            Role::Host => "end meeting",
            Role::Guest => "leave meeting",
        };

        match result {
            Ok(()) => self.shut_down(true).await,
            Err(e) if self.close_forced => {
                tracing::warn!("{} failed, closing anyway: {}", operation, e);
                self.shut_down(false).await
            }
            Err(e) => {
                tracing::error!("{} failed: {}", operation, e);
                self.ui.emit(UiEvent::RemoteRequestFailed {
                    operation,
                    reason: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Run every shutdown step, even after one of them failed
    ///
    /// `announce_end` is set once the registry has accepted the end of the
    /// meeting; only then is the room told.
    async fn shut_down(&mut self, announce_end: bool) -> Result<(), ControllerError> {
        self.transition(LifecycleState::Ending)?;

        match self.session.credentials().role {
            Role::Guest => self.session.leave_once().await,
            Role::Host if announce_end => {
                if let Err(e) = self.session.broadcast_end().await {
                    tracing::warn!("could not announce end of meeting: {}", e);
                }
            }
            Role::Host => {}
        }
        self.session.close().await;

        if !self.transfers.is_empty() {
            tracing::warn!("abandoning {} unfinished transfers", self.transfers.len());
            self.transfers.clear();
        }

        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear session credentials: {}", e);
        }

        if self.mounted {
            self.deps.mounter.unmount(&self.target.virtual_mountpoint).await;
            self.mounted = false;
        }

        self.transition(LifecycleState::Ended)?;
        self.ui.emit(UiEvent::SessionClosed);
        Ok(())
    }

    /// Start publishing what changed in the upload folder
    async fn scan_local(&mut self) {
        let Some(scanner) = self.scanner.as_mut() else {
            return;
        };

        let changes = match scanner.scan().await {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!("failed to scan {}: {}", scanner.dir().display(), e);
                return;
            }
        };

        for change in changes {
            let registry = self.deps.registry.clone();
            let creds = self.session.credentials().clone();

            self.transfers.push(Box::pin(async move {
                let result = match &change {
                    LocalChange::Upserted(path) => {
                        tracing::info!("publishing {}", path.display());
                        registry.upload(&creds, path).await
                    }
                    LocalChange::Removed(filename) => {
                        tracing::info!("withdrawing {}", filename);
                        registry.delete(&creds, filename).await
                    }
                };
                (change, result)
            }));
        }
    }

    fn on_transfer_finished(&mut self, change: LocalChange, result: Result<(), ApiError>) {
        let operation = match change {
            LocalChange::Upserted(_) => "upload",
            LocalChange::Removed(_) => "delete",
        };

        match result {
            Ok(()) => tracing::debug!("{} done: {:?}", operation, change),
            Err(e) => {
                tracing::error!("{} failed for {:?}: {}", operation, change, e);
                self.ui.emit(UiEvent::RemoteRequestFailed {
                    operation,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Resolves with the in-flight close call, or never if there is none
async fn poll_pending(pending: &mut Option<PendingClose>) -> Result<(), ApiError> {
    match pending.as_mut() {
        Some(call) => {
            let result = call.await;
            *pending = None;
            result
        }
        None => std::future::pending().await,
    }
}
