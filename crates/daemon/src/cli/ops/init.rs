use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use roomdrop_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Meeting registry URL
    #[arg(long)]
    pub server_url: Option<String>,

    /// Realtime room WebSocket URL
    #[arg(long)]
    pub channel_url: Option<String>,

    /// Where meeting folders are mounted (default: ~/Roomdrop)
    #[arg(long)]
    pub mount_root: Option<PathBuf>,

    /// Where session credentials are handed off (default: the system temp dir)
    #[arg(long)]
    pub credentials_dir: Option<PathBuf>,

    /// Mount helper executable
    #[arg(long)]
    pub mount_helper: Option<String>,

    /// Seconds to wait for the mount helper
    #[arg(long)]
    pub mount_timeout: Option<u64>,

    /// Also write daily log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct InitOutput {
    pub roomdrop_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl fmt::Display for InitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} roomdrop at {}",
            "Initialized".green().bold(),
            self.roomdrop_dir.display().to_string().bold()
        )?;
        writeln!(f, "  {} {}", "Config:".dimmed(), self.config_path.display())?;
        writeln!(f, "  {} {}", "Registry:".dimmed(), self.config.server_url)?;
        writeln!(f, "  {} {}", "Room:".dimmed(), self.config.channel_url)?;
        writeln!(
            f,
            "  {} {}",
            "Mount root:".dimmed(),
            self.config.mount_root.display()
        )?;
        write!(
            f,
            "  {} {}",
            "Credentials:".dimmed(),
            self.config.credentials_dir.display()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = InitOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let roomdrop_dir = AppState::roomdrop_dir(ctx.config_path.clone())?;

        let mut config = AppConfig::default_for(&roomdrop_dir);
        if let Some(server_url) = &self.server_url {
            config.server_url = server_url.clone();
        }
        if let Some(channel_url) = &self.channel_url {
            config.channel_url = channel_url.clone();
        }
        if let Some(mount_root) = &self.mount_root {
            config.mount_root = mount_root.clone();
        }
        if let Some(credentials_dir) = &self.credentials_dir {
            config.credentials_dir = credentials_dir.clone();
        }
        if let Some(mount_helper) = &self.mount_helper {
            config.mount_helper = mount_helper.clone();
        }
        if let Some(mount_timeout) = self.mount_timeout {
            config.mount_timeout_secs = mount_timeout;
        }
        config.log_dir = self.log_dir.clone();

        // reject bad URLs before anything is written
        config.engine_config()?;

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        Ok(InitOutput {
            roomdrop_dir: state.roomdrop_dir,
            config_path: state.config_path,
            config: state.config,
        })
    }
}
