//! Realtime session with the meeting room
//!
//! - `channel`: transport-agnostic event channel traits
//! - `ws`: WebSocket transport
//! - `client`: dispatch of room events to roster, tree and chat
//! - `projection`: events reported to the UI

mod channel;
mod client;
mod projection;
mod roster;
mod ws;

pub use channel::{ChannelError, Connector, EventChannel};
pub use client::{Dispatch, RealtimeSession};
pub use projection::{UiEvent, UiSink};
pub use roster::Roster;
pub use ws::{WsChannel, WsConnector};
