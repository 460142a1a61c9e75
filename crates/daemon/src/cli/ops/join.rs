use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::{CredentialError, CredentialStore, Role, SessionCredentials};
use roomdrop_daemon::registry::meetings::{JoinMeetingRequest, JoinMeetingResponse};
use roomdrop_daemon::registry::ApiError;
use roomdrop_daemon::state::StateError;

use crate::cli::op::OpContextError;

/// Register as a guest of a meeting and prepare the guest session
#[derive(Args, Debug, Clone)]
pub struct Join {
    #[command(flatten)]
    pub request: JoinMeetingRequest,

    /// Replace a guest session that is still recorded
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug)]
pub struct JoinOutput {
    pub title: String,
    pub host: String,
    pub fullname: String,
    pub mountpoint: PathBuf,
}

impl fmt::Display for JoinOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} as {}",
            "Joined".green().bold(),
            self.title.bold(),
            self.fullname.bold()
        )?;
        writeln!(f, "  {} {}", "host:".dimmed(), self.host)?;
        writeln!(f, "  {} {}", "folder:".dimmed(), self.mountpoint.display())?;
        write!(f, "Run {} to go live", "roomdrop session --role guest".bold())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Context(#[from] OpContextError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("a guest session is already recorded at {0} (use --force to replace it)")]
    SessionInProgress(PathBuf),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Join {
    type Error = JoinError;
    type Output = JoinOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let store = CredentialStore::for_role(&state.config.credentials_dir, Role::Guest);
        if store.exists() && !self.force {
            return Err(JoinError::SessionInProgress(store.path().to_path_buf()));
        }

        let client = ctx.client(&state)?;
        let response: JoinMeetingResponse = client.call(self.request.clone()).await?;

        let (local, virtual_mountpoint) =
            state.config.mountpoints_for(&response.meeting, Role::Guest);
        let creds = SessionCredentials::for_guest(
            &response.meeting,
            &response.guest,
            local,
            virtual_mountpoint.clone(),
        );
        store.save(&creds)?;

        tracing::info!(
            "joined meeting {} as guest {}",
            response.meeting.uid,
            response.guest.uid
        );

        Ok(JoinOutput {
            title: response.meeting.title,
            host: response.meeting.host_fullname,
            fullname: response.guest.fullname,
            mountpoint: virtual_mountpoint,
        })
    }
}
