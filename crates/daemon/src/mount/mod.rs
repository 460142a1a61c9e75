//! Mount supervision
//!
//! The shared tree is exposed to the user by an external mount helper that
//! mirrors the session's backing directory at the virtual mountpoint. This
//! module starts that helper, bounds how long it may take, and tears the
//! mount down again at session end.

mod status;
mod supervisor;

pub use status::MountStatus;
pub use supervisor::{HelperMounter, MountTarget, Mounter};
