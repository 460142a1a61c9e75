//! Realtime meeting room wire protocol
//!
//! Every event travels as one JSON text frame shaped like
//! `{"event": "<name>", "data": {...}}`. Event names follow the room server's
//! vocabulary ("new join", "leaved", "delete file guest", ...).

mod events;

pub use events::{
    DeleteScope, Envelope, InboundEvent, OutboundEvent, ProtocolError, PublicFile,
};
