pub mod init;
pub mod join;
pub mod new;
pub mod session;
pub mod status;

pub use init::Init;
pub use join::Join;
pub use new::New;
pub use session::Session;
pub use status::Status;

crate::command_enum! {
    (Init, Init),
    (New, New),
    (Join, Join),
    (Session, Session),
    (Status, Status),
}
