use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Raw event frame as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("malformed payload for '{event}': {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which part of the tree a remote deletion applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    Public,
    Guest(String),
}

/// A file already present in the room when a participant joins
///
/// Older room servers only send the bare file name; those are host files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicFile {
    Name(String),
    Entry {
        filename: String,
        author_fullname: String,
    },
}

impl PublicFile {
    pub fn filename(&self) -> &str {
        match self {
            PublicFile::Name(name) => name,
            PublicFile::Entry { filename, .. } => filename,
        }
    }

    /// Author of the file, falling back to the host for bare names
    pub fn author<'a>(&'a self, host_fullname: &'a str) -> &'a str {
        match self {
            PublicFile::Name(_) => host_fullname,
            PublicFile::Entry {
                author_fullname, ..
            } => author_fullname,
        }
    }
}

/// Events received from the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    NewJoin {
        guest_fullname: String,
        guests: Vec<String>,
        public_files: Vec<PublicFile>,
    },
    Leaved {
        guest_fullname: String,
        guests: Vec<String>,
    },
    NewFile {
        filename: String,
        author_fullname: String,
        author_uid: Option<String>,
    },
    DeleteFile {
        filename: String,
        scope: DeleteScope,
    },
    Message {
        from: String,
        text: String,
    },
    Ended,
    /// An event this client does not understand; kept for logging
    Unknown {
        event: String,
    },
}

#[derive(Deserialize)]
struct NewJoinPayload {
    guest_fullname: String,
    #[serde(default)]
    guests: Vec<String>,
    #[serde(default)]
    public_files: Vec<PublicFile>,
}

#[derive(Deserialize)]
struct LeavedPayload {
    #[serde(default)]
    guest_fullname: String,
    #[serde(default)]
    guests: Vec<String>,
}

#[derive(Deserialize)]
struct NewFilePayload {
    filename: String,
    author_fullname: String,
    #[serde(default)]
    author_uid: Option<String>,
}

#[derive(Deserialize)]
struct DeletePublicPayload {
    filename: String,
}

#[derive(Deserialize)]
struct DeleteGuestPayload {
    filename: String,
    guest_fullname: String,
}

#[derive(Deserialize)]
struct MessagePayload {
    text: String,
    #[serde(default)]
    from: String,
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::MalformedPayload {
        event: event.to_string(),
        source,
    })
}

impl InboundEvent {
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { event, data } = envelope;

        let parsed = match event.as_str() {
            "new join" => {
                let p: NewJoinPayload = payload(&event, data)?;
                InboundEvent::NewJoin {
                    guest_fullname: p.guest_fullname,
                    guests: p.guests,
                    public_files: p.public_files,
                }
            }
            "leaved" => {
                let p: LeavedPayload = payload(&event, data)?;
                InboundEvent::Leaved {
                    guest_fullname: p.guest_fullname,
                    guests: p.guests,
                }
            }
            "new file" => {
                let p: NewFilePayload = payload(&event, data)?;
                InboundEvent::NewFile {
                    filename: p.filename,
                    author_fullname: p.author_fullname,
                    author_uid: p.author_uid,
                }
            }
            "delete file public" => {
                let p: DeletePublicPayload = payload(&event, data)?;
                InboundEvent::DeleteFile {
                    filename: p.filename,
                    scope: DeleteScope::Public,
                }
            }
            "delete file guest" => {
                let p: DeleteGuestPayload = payload(&event, data)?;
                InboundEvent::DeleteFile {
                    filename: p.filename,
                    scope: DeleteScope::Guest(p.guest_fullname),
                }
            }
            "message" => {
                let p: MessagePayload = payload(&event, data)?;
                InboundEvent::Message {
                    from: p.from,
                    text: p.text,
                }
            }
            "ended" => InboundEvent::Ended,
            _ => InboundEvent::Unknown { event },
        };

        Ok(parsed)
    }

    /// Decode a text frame
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(frame).map_err(ProtocolError::MalformedFrame)?;
        Self::from_envelope(envelope)
    }

    /// Event name, for logging
    pub fn name(&self) -> &str {
        match self {
            InboundEvent::NewJoin { .. } => "new join",
            InboundEvent::Leaved { .. } => "leaved",
            InboundEvent::NewFile { .. } => "new file",
            InboundEvent::DeleteFile {
                scope: DeleteScope::Public,
                ..
            } => "delete file public",
            InboundEvent::DeleteFile { .. } => "delete file guest",
            InboundEvent::Message { .. } => "message",
            InboundEvent::Ended => "ended",
            InboundEvent::Unknown { event } => event,
        }
    }
}

/// Events this client sends to the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "join")]
    Join {
        meeting_uid: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        guest_fullname: Option<String>,
    },
    #[serde(rename = "leave")]
    Leave {
        meeting_uid: String,
        guest_fullname: String,
    },
    #[serde(rename = "message")]
    Message {
        meeting_uid: String,
        from: String,
        text: String,
    },
    #[serde(rename = "end")]
    End { meeting_uid: String },
}

impl OutboundEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::MalformedFrame)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Join { .. } => "join",
            OutboundEvent::Leave { .. } => "leave",
            OutboundEvent::Message { .. } => "message",
            OutboundEvent::End { .. } => "end",
        }
    }
}
