use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::{CredentialError, CredentialStore, Role, SessionCredentials};
use roomdrop_daemon::state::StateError;

/// Show which sessions are recorded on this machine
#[derive(Args, Debug, Clone)]
pub struct Status;

#[derive(Debug)]
pub enum SessionRecord {
    None,
    Recorded(Box<SessionCredentials>),
    Unreadable(String),
}

#[derive(Debug)]
pub struct StatusOutput {
    pub roomdrop_dir: PathBuf,
    pub sessions: Vec<(Role, PathBuf, SessionRecord)>,
}

impl fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            "Roomdrop:".bold(),
            self.roomdrop_dir.display()
        )?;

        for (i, (role, path, record)) in self.sessions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {} ", format!("{}:", role).bold())?;
            match record {
                SessionRecord::None => write!(f, "{}", "no session".dimmed())?,
                SessionRecord::Recorded(creds) => {
                    writeln!(f, "{} {}", creds.title.green(), creds.meeting_uid.dimmed())?;
                    writeln!(f, "    {} {}", "as:".dimmed(), creds.display_name())?;
                    write!(
                        f,
                        "    {} {}",
                        "folder:".dimmed(),
                        creds.virtual_mountpoint.display()
                    )?;
                }
                SessionRecord::Unreadable(reason) => write!(
                    f,
                    "{} {} ({})",
                    "unreadable".red(),
                    path.display(),
                    reason
                )?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Status {
    type Error = StatusError;
    type Output = StatusOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;

        let sessions = [Role::Host, Role::Guest]
            .into_iter()
            .map(|role| {
                let store = CredentialStore::for_role(&state.config.credentials_dir, role);
                let record = match store.load() {
                    Ok(creds) => SessionRecord::Recorded(Box::new(creds)),
                    Err(CredentialError::MissingSession(_)) => SessionRecord::None,
                    Err(e) => SessionRecord::Unreadable(e.to_string()),
                };
                (role, store.path().to_path_buf(), record)
            })
            .collect();

        Ok(StatusOutput {
            roomdrop_dir: state.roomdrop_dir,
            sessions,
        })
    }
}
