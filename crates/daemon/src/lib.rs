// Session engine
pub mod lifecycle;
pub mod mount;
pub mod reconciler;
pub mod registry;
pub mod session;

// App state (configuration, paths)
pub mod state;

pub use lifecycle::{SessionCommand, SessionController, SessionDeps};
pub use session::{UiEvent, UiSink};
pub use state::{AppConfig, AppState, EngineConfig, StateError};
