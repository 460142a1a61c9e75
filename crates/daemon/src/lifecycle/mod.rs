//! Session lifecycle
//!
//! [`SessionController`] drives a session from mount to shutdown:
//!
//! ```text
//! Initializing -> Mounting -> Joining -> Bootstrapping -> Active -> Ending -> Ended
//! ```
//!
//! Failures while starting leave the session where it is until the user asks
//! for a retry. Shutdown always reaches `Ended`.

mod controller;
mod state;

pub use controller::{ControllerError, SessionCommand, SessionController, SessionDeps};
pub use state::{Lifecycle, LifecycleState, TransitionError};
