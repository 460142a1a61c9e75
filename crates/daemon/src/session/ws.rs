use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use common::protocol::{InboundEvent, OutboundEvent};

use super::channel::{ChannelError, Connector, EventChannel};

/// Connects to the room server over WebSocket
///
/// One JSON text frame per event: `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn EventChannel>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        tracing::info!("connected to room at {}", self.url);
        Ok(Box::new(WsChannel { stream }))
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventChannel for WsChannel {
    async fn send(&mut self, event: &OutboundEvent) -> Result<(), ChannelError> {
        let frame = event.encode()?;
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| ChannelError::Disconnected(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<InboundEvent, ChannelError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(InboundEvent::decode(&text).map_err(ChannelError::from))
                }
                Some(Ok(Message::Close(_))) | None => return None,
                // tungstenite answers pings itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some(Err(ChannelError::Disconnected(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("error closing room connection: {}", e);
        }
    }
}
