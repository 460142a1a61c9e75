use std::path::PathBuf;

use clap::Parser;
use url::Url;

use super::ops::Command;

/// Roomdrop: share a folder tree live with everyone in a meeting
#[derive(Parser, Debug)]
#[command(name = "roomdrop", version, about)]
pub struct Args {
    /// Roomdrop directory (defaults to ~/.roomdrop)
    #[arg(long, global = true, env = "ROOMDROP_DIR")]
    pub config_path: Option<PathBuf>,

    /// Meeting registry URL, overriding the configured one
    #[arg(long, global = true, env = "ROOMDROP_REMOTE")]
    pub remote: Option<Url>,

    #[command(subcommand)]
    pub command: Command,
}
