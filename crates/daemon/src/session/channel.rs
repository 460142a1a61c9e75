use async_trait::async_trait;

use common::protocol::{InboundEvent, OutboundEvent, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to connect to the room: {0}")]
    Connect(String),
    #[error("room connection lost: {0}")]
    Disconnected(String),
    /// A single bad frame; the connection itself is still usable
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ChannelError {
    /// Whether the channel can still be used after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChannelError::Protocol(_))
    }
}

/// A live, bidirectional connection to a meeting room
#[async_trait]
pub trait EventChannel: Send {
    async fn send(&mut self, event: &OutboundEvent) -> Result<(), ChannelError>;

    /// Next event from the room, or `None` once the room closed the channel
    ///
    /// Must be cancel safe: dropping the future loses no event.
    async fn recv(&mut self) -> Option<Result<InboundEvent, ChannelError>>;

    async fn close(&mut self);
}

/// Opens event channels
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn EventChannel>, ChannelError>;
}
