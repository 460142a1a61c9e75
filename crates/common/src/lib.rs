//! Shared types for Roomdrop meeting sessions
//!
//! Everything in here is used by both sides of the credential hand-off: the
//! short-lived process that creates or joins a meeting, and the long-lived
//! process that runs the live session.

pub mod credentials;
pub mod meeting;
pub mod protocol;
pub mod role;

pub use credentials::{CredentialError, CredentialStore, SessionCredentials};
pub use meeting::{Guest, Meeting};
pub use role::Role;

pub mod prelude {
    pub use crate::credentials::{CredentialError, CredentialStore, SessionCredentials};
    pub use crate::meeting::{Guest, Meeting};
    pub use crate::protocol::{DeleteScope, InboundEvent, OutboundEvent, PublicFile};
    pub use crate::role::Role;
}
