use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::{CredentialError, CredentialStore, Role, SessionCredentials};
use roomdrop_daemon::registry::meetings::{CreateMeetingRequest, CreateMeetingResponse};
use roomdrop_daemon::registry::ApiError;
use roomdrop_daemon::state::StateError;

use crate::cli::op::OpContextError;

/// Create a meeting and prepare the host session
#[derive(Args, Debug, Clone)]
pub struct New {
    #[command(flatten)]
    pub request: CreateMeetingRequest,

    /// Replace a host session that is still recorded
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug)]
pub struct NewOutput {
    pub uid: String,
    pub title: String,
    pub password: String,
    pub mountpoint: PathBuf,
}

impl fmt::Display for NewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} meeting {}",
            "Created".green().bold(),
            self.title.bold()
        )?;
        writeln!(f, "  {} {}", "uid:".dimmed(), self.uid)?;
        writeln!(f, "  {} {}", "password:".dimmed(), self.password)?;
        writeln!(f, "  {} {}", "folder:".dimmed(), self.mountpoint.display())?;
        write!(
            f,
            "Share the uid and password with your guests, then run {}",
            "roomdrop session --role host".bold()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NewError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Context(#[from] OpContextError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("a host session is already recorded at {0} (use --force to replace it)")]
    SessionInProgress(PathBuf),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for New {
    type Error = NewError;
    type Output = NewOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let store = CredentialStore::for_role(&state.config.credentials_dir, Role::Host);
        if store.exists() && !self.force {
            return Err(NewError::SessionInProgress(store.path().to_path_buf()));
        }

        let client = ctx.client(&state)?;
        let response: CreateMeetingResponse = client.call(self.request.clone()).await?;
        let meeting = response.meeting;

        let (local, virtual_mountpoint) = state.config.mountpoints_for(&meeting, Role::Host);
        let creds = SessionCredentials::for_host(&meeting, local, virtual_mountpoint.clone());
        store.save(&creds)?;

        tracing::info!("created meeting {}", meeting.uid);

        Ok(NewOutput {
            uid: meeting.uid,
            title: meeting.title,
            password: meeting.password,
            mountpoint: virtual_mountpoint,
        })
    }
}
