use std::fmt;
use std::io::BufRead;

use clap::Args;
use owo_colors::OwoColorize;

use common::Role;
use roomdrop_daemon::lifecycle::{ControllerError, SessionCommand, SessionController};
use roomdrop_daemon::session::UiEvent;
use roomdrop_daemon::state::StateError;

/// Run the live session recorded by `new` or `join`
///
/// Type a line to chat. `/retry` retries a failed step, `/quit` leaves (or
/// ends) the meeting and `/quit!` closes even if the registry cannot be
/// reached. Ctrl-C behaves like `/quit`, twice like `/quit!`.
#[derive(Args, Debug, Clone)]
pub struct Session {
    /// Which recorded session to run
    #[arg(long)]
    pub role: Role,
}

#[derive(Debug)]
pub struct SessionOutput {
    pub role: Role,
    pub title: String,
}

impl fmt::Display for SessionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} session for {}",
            "Closed".green().bold(),
            self.role,
            self.title.bold()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    match line.trim() {
        "" => None,
        "/retry" => Some(SessionCommand::Retry),
        "/quit" => Some(SessionCommand::Close { force: false }),
        "/quit!" => Some(SessionCommand::Close { force: true }),
        text => Some(SessionCommand::SendMessage(text.to_string())),
    }
}

/// Feed typed lines to the session until input ends or the session is gone
fn forward_lines<R: BufRead>(reader: R, commands: flume::Sender<SessionCommand>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if let Some(command) = parse_command(&line) {
            if commands.send(command).is_err() {
                break;
            }
        }
    }
}

fn render(event: &UiEvent) -> String {
    match event {
        UiEvent::LifecycleChanged { to, .. } => format!("{} {}", "»".dimmed(), to),
        UiEvent::MountFailed { reason } => format!(
            "{} {} ({} to try again)",
            "mount failed:".red().bold(),
            reason,
            "/retry".bold()
        ),
        UiEvent::RosterChanged { host, guests } => format!(
            "{} {} (host){}{}",
            "in the room:".dimmed(),
            host,
            if guests.is_empty() { "" } else { ", " },
            guests.join(", ")
        ),
        UiEvent::ParticipantJoined { name } => format!("{} {}", "+".green(), name),
        UiEvent::ParticipantLeft { name } => format!("{} {}", "-".red(), name),
        UiEvent::TreeEntryAdded { path, author } => match author {
            Some(author) => format!("{} {} by {}", "new file".cyan(), path.display(), author),
            None => format!("{} {}/", "new folder".cyan(), path.display()),
        },
        UiEvent::TreeEntryRemoved { path } => {
            format!("{} {}", "removed".yellow(), path.display())
        }
        UiEvent::ChatMessageReceived { from, text } => format!("{} {}", format!("<{}>", from).bold(), text),
        UiEvent::Degraded { reason } => format!("{} {}", "warning:".yellow().bold(), reason),
        UiEvent::ChannelLost { reason } => format!(
            "{} {} ({} to reconnect)",
            "disconnected:".red().bold(),
            reason,
            "/retry".bold()
        ),
        UiEvent::RemoteRequestFailed { operation, reason } => format!(
            "{} {} ({})",
            format!("{} failed:", operation).red().bold(),
            reason,
            "/quit! to close anyway".dimmed()
        ),
        UiEvent::MeetingEnded => "the host ended the meeting".yellow().bold().to_string(),
        UiEvent::SessionClosed => "session closed".dimmed().to_string(),
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Session {
    type Error = SessionError;
    type Output = SessionOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let mut config = state.config.engine_config()?;
        if let Some(remote) = &ctx.remote {
            config.server_url = remote.clone();
        }

        let (ui_tx, ui_rx) = flume::unbounded::<UiEvent>();
        let controller = SessionController::resume(&config, self.role, std::sync::Arc::new(ui_tx))?;
        let title = controller.session().credentials().title.clone();

        let (commands_tx, commands_rx) = flume::unbounded();

        let printer = tokio::spawn(async move {
            while let Ok(event) = ui_rx.recv_async().await {
                println!("{}", render(&event));
            }
        });

        // plain thread: a pending stdin read would keep the runtime from shutting down
        let stdin_tx = commands_tx.clone();
        std::thread::spawn(move || forward_lines(std::io::stdin().lock(), stdin_tx));

        let interrupt = tokio::spawn(async move {
            let mut force = false;
            while tokio::signal::ctrl_c().await.is_ok() {
                if commands_tx.send_async(SessionCommand::Close { force }).await.is_err() {
                    break;
                }
                force = true;
            }
        });

        let result = controller.run(commands_rx).await;

        interrupt.abort();
        // the controller owned the last UI sender, so the printer drains and exits
        let _ = printer.await;

        result?;
        Ok(SessionOutput {
            role: self.role,
            title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("/retry"), Some(SessionCommand::Retry));
        assert_eq!(
            parse_command("/quit!"),
            Some(SessionCommand::Close { force: true })
        );
        assert_eq!(
            parse_command(" hello all "),
            Some(SessionCommand::SendMessage("hello all".to_string()))
        );
    }

    #[test]
    fn test_render_terminal_events() {
        assert!(render(&UiEvent::MeetingEnded).contains("the host ended the meeting"));
        assert!(render(&UiEvent::SessionClosed).contains("session closed"));
    }

    #[test]
    fn test_forward_lines_until_eof() {
        let (tx, rx) = flume::unbounded();
        forward_lines(std::io::Cursor::new("hi\n\n/retry\n/quit\n"), tx);

        let commands: Vec<_> = rx.drain().collect();
        assert_eq!(
            commands,
            vec![
                SessionCommand::SendMessage("hi".to_string()),
                SessionCommand::Retry,
                SessionCommand::Close { force: false },
            ]
        );
        // the sender went away with the reader
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_forward_lines_stops_when_session_is_gone() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        // returns instead of reading on
        forward_lines(std::io::Cursor::new("one\ntwo\n"), tx);
    }
}
