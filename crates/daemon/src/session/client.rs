use std::sync::Arc;

use common::protocol::{InboundEvent, OutboundEvent, PublicFile};
use common::{Role, SessionCredentials};

use super::channel::{ChannelError, Connector, EventChannel};
use super::projection::{UiEvent, UiSink};
use super::roster::Roster;
use crate::reconciler::{DirectoryReconciler, ReconcileError, TreeChange};

/// What the caller should do after an event was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    /// The room is gone; the session must shut down
    Ended,
}

/// One participant's presence in a meeting room
///
/// Owns the event channel (when connected) and routes every inbound event to
/// the roster, the reconciler or the chat feed. Roster and tree outlive a
/// dropped connection, so a reconnect picks up where it left off.
pub struct RealtimeSession {
    creds: SessionCredentials,
    reconciler: DirectoryReconciler,
    roster: Roster,
    ui: Arc<dyn UiSink>,
    channel: Option<Box<dyn EventChannel>>,
    leave_sent: bool,
}

impl RealtimeSession {
    pub fn new(creds: SessionCredentials, ui: Arc<dyn UiSink>) -> Self {
        let reconciler = DirectoryReconciler::new(
            creds.local_mountpoint.clone(),
            creds.role,
            creds.display_name(),
            creds.host_fullname.clone(),
        )
        .with_uids(
            creds.author_uid().map(str::to_string),
            Some(creds.host_uid.clone()),
        );
        let roster = Roster::new(creds.host_fullname.clone());

        Self {
            creds,
            reconciler,
            roster,
            ui,
            channel: None,
            leave_sent: false,
        }
    }

    pub fn credentials(&self) -> &SessionCredentials {
        &self.creds
    }

    pub fn reconciler(&self) -> &DirectoryReconciler {
        &self.reconciler
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    fn join_event(&self) -> OutboundEvent {
        OutboundEvent::Join {
            meeting_uid: self.creds.meeting_uid.clone(),
            guest_fullname: match self.creds.role {
                Role::Host => None,
                Role::Guest => Some(self.creds.display_name().to_string()),
            },
        }
    }

    /// Open a channel to the room and announce ourselves
    ///
    /// Replaces any previous channel.
    pub async fn connect(&mut self, connector: &dyn Connector) -> Result<(), ChannelError> {
        if let Some(mut stale) = self.channel.take() {
            stale.close().await;
        }

        let mut channel = connector.connect().await?;
        channel.send(&self.join_event()).await?;
        tracing::info!(
            "joined meeting {} as {} ({})",
            self.creds.meeting_uid,
            self.creds.display_name(),
            self.creds.role
        );

        self.channel = Some(channel);
        Ok(())
    }

    /// Next event from the room; never resolves while disconnected
    pub async fn recv(&mut self) -> Option<Result<InboundEvent, ChannelError>> {
        match self.channel.as_mut() {
            Some(channel) => channel.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Forget a channel that failed
    pub fn mark_lost(&mut self) {
        self.channel = None;
    }

    pub fn dispatch(&mut self, event: InboundEvent) -> Dispatch {
        tracing::debug!("dispatching '{}'", event.name());

        match event {
            InboundEvent::NewJoin {
                guest_fullname,
                guests,
                public_files,
            } => {
                self.update_roster(guests);
                self.ui.emit(UiEvent::ParticipantJoined {
                    name: guest_fullname.clone(),
                });

                let mut joined = vec![guest_fullname.clone()];
                if self.creds.role == Role::Host {
                    joined.extend(self.roster.guests().iter().cloned());
                }
                for name in joined {
                    let result = self.reconciler.on_participant_joined(&name);
                    self.apply(result);
                }

                if self.creds.role == Role::Guest && guest_fullname == self.creds.display_name() {
                    self.bootstrap_from(&public_files);
                }
            }
            InboundEvent::Leaved {
                guest_fullname,
                guests,
            } => {
                self.update_roster(guests);
                if !guest_fullname.is_empty() {
                    self.ui.emit(UiEvent::ParticipantLeft {
                        name: guest_fullname,
                    });
                }
            }
            InboundEvent::NewFile {
                filename,
                author_fullname,
                author_uid,
            } => {
                let result = self.reconciler.on_file_added(
                    &filename,
                    &author_fullname,
                    author_uid.as_deref(),
                );
                self.apply(result);
            }
            InboundEvent::DeleteFile { filename, scope } => {
                let result = self.reconciler.on_file_deleted(&filename, &scope);
                self.apply(result);
            }
            InboundEvent::Message { from, text } => {
                self.ui.emit(UiEvent::ChatMessageReceived { from, text });
            }
            InboundEvent::Ended => {
                tracing::info!("meeting {} ended by the host", self.creds.meeting_uid);
                return Dispatch::Ended;
            }
            InboundEvent::Unknown { event } => {
                tracing::debug!("ignoring unknown event '{}'", event);
            }
        }

        Dispatch::Continue
    }

    fn update_roster(&mut self, guests: Vec<String>) {
        if self.roster.rebuild(guests) {
            self.ui.emit(UiEvent::RosterChanged {
                host: self.roster.host().to_string(),
                guests: self.roster.guests().to_vec(),
            });
        }
    }

    fn bootstrap_from(&mut self, public_files: &[PublicFile]) {
        let outcome = self.reconciler.on_bootstrap(public_files);
        self.project(outcome.changes);
        for error in outcome.skipped {
            self.ui.emit(UiEvent::Degraded {
                reason: error.to_string(),
            });
        }
    }

    fn apply(&self, result: Result<Vec<TreeChange>, ReconcileError>) {
        match result {
            Ok(changes) => self.project(changes),
            Err(e) => {
                tracing::warn!("failed to reconcile tree: {}", e);
                self.ui.emit(UiEvent::Degraded {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn project(&self, changes: Vec<TreeChange>) {
        for change in changes {
            self.ui.emit(change.into());
        }
    }

    async fn send(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| ChannelError::Disconnected("not connected".to_string()))?;
        channel.send(&event).await
    }

    pub async fn send_message(&mut self, text: &str) -> Result<(), ChannelError> {
        let event = OutboundEvent::Message {
            meeting_uid: self.creds.meeting_uid.clone(),
            from: self.creds.display_name().to_string(),
            text: text.to_string(),
        };
        self.send(event).await
    }

    /// Tell the room this guest is leaving; only the first call sends anything
    pub async fn leave_once(&mut self) {
        if self.leave_sent || self.creds.role != Role::Guest {
            return;
        }
        self.leave_sent = true;

        let event = OutboundEvent::Leave {
            meeting_uid: self.creds.meeting_uid.clone(),
            guest_fullname: self.creds.display_name().to_string(),
        };
        if let Err(e) = self.send(event).await {
            tracing::warn!("could not announce leave: {}", e);
        }
    }

    /// Tell everyone in the room that the meeting is over (host only)
    pub async fn broadcast_end(&mut self) -> Result<(), ChannelError> {
        let event = OutboundEvent::End {
            meeting_uid: self.creds.meeting_uid.clone(),
        };
        self.send(event).await
    }

    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }
}
