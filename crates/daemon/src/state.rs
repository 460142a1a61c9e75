//! Application configuration and on-disk state
//!
//! Configuration lives in `config.toml` inside the roomdrop directory
//! (`~/.roomdrop` unless overridden). Everything the engine needs at runtime is
//! derived from it into an explicit [`EngineConfig`], so no component reads
//! ambient paths on its own.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use common::{Meeting, Role};

pub const ROOMDROP_DIR_NAME: &str = ".roomdrop";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const MEETINGS_DIR_NAME: &str = "meetings";

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_channel_url() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_mount_helper() -> String {
    "roomdrop-fs".to_string()
}

fn default_unmount_command() -> Vec<String> {
    if cfg!(target_os = "linux") {
        vec!["fusermount".to_string(), "-u".to_string()]
    } else {
        vec!["umount".to_string()]
    }
}

fn default_mount_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_scan_interval_ms() -> u64 {
    1000
}

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the meeting registry REST API
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// WebSocket URL of the realtime room server
    #[serde(default = "default_channel_url")]
    pub channel_url: String,
    /// Parent directory of the user-visible meeting folders
    pub mount_root: PathBuf,
    /// Parent directory of the backing directories the mount helper mirrors
    pub data_dir: PathBuf,
    /// Where session credentials are handed off between processes
    pub credentials_dir: PathBuf,
    /// Mount helper executable
    #[serde(default = "default_mount_helper")]
    pub mount_helper: String,
    /// Command (and leading args) used to unmount; the target is appended
    #[serde(default = "default_unmount_command")]
    pub unmount_command: Vec<String>,
    #[serde(default = "default_mount_timeout_secs")]
    pub mount_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How often the local upload folder is scanned for changes
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    /// If set, logs are also written to daily files in this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults rooted at the user's home and the given roomdrop directory
    pub fn default_for(roomdrop_dir: &Path) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| roomdrop_dir.to_path_buf());
        Self {
            server_url: default_server_url(),
            channel_url: default_channel_url(),
            mount_root: home.join("Roomdrop"),
            data_dir: roomdrop_dir.join(MEETINGS_DIR_NAME),
            credentials_dir: std::env::temp_dir(),
            mount_helper: default_mount_helper(),
            unmount_command: default_unmount_command(),
            mount_timeout_secs: default_mount_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            scan_interval_ms: default_scan_interval_ms(),
            log_dir: None,
        }
    }

    /// Backing and virtual mountpoints for a participant of `meeting`
    ///
    /// Returns `(local_mountpoint, virtual_mountpoint)`.
    pub fn mountpoints_for(&self, meeting: &Meeting, role: Role) -> (PathBuf, PathBuf) {
        let local = self.data_dir.join(&meeting.uid).join(role.as_str());

        let name = sanitize_folder_name(&meeting.title);
        let folder = if name.is_empty() {
            meeting.uid.clone()
        } else {
            format!("{}-{}", name, meeting.uid)
        };

        (local, self.mount_root.join(folder))
    }

    pub fn engine_config(&self) -> Result<EngineConfig, StateError> {
        let server_url = Url::parse(&self.server_url)
            .map_err(|e| StateError::InvalidConfig(format!("server_url: {}", e)))?;
        let channel_url = Url::parse(&self.channel_url)
            .map_err(|e| StateError::InvalidConfig(format!("channel_url: {}", e)))?;

        if self.unmount_command.is_empty() {
            return Err(StateError::InvalidConfig(
                "unmount_command must not be empty".to_string(),
            ));
        }

        Ok(EngineConfig {
            server_url,
            channel_url,
            credentials_dir: self.credentials_dir.clone(),
            mount_helper: PathBuf::from(&self.mount_helper),
            unmount_command: self.unmount_command.clone(),
            mount_timeout: Duration::from_secs(self.mount_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            scan_interval: Duration::from_millis(self.scan_interval_ms.max(50)),
        })
    }
}

/// Sanitize a meeting title for use as a folder name
fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Runtime parameters handed to the session engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_url: Url,
    pub channel_url: Url,
    pub credentials_dir: PathBuf,
    pub mount_helper: PathBuf,
    pub unmount_command: Vec<String>,
    pub mount_timeout: Duration,
    pub request_timeout: Duration,
    pub scan_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("roomdrop is not initialized at {0} (run 'roomdrop init')")]
    NotInitialized(PathBuf),
    #[error("roomdrop is already initialized at {0}")]
    AlreadyInitialized(PathBuf),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved roomdrop directory and its loaded configuration
#[derive(Debug, Clone)]
pub struct AppState {
    pub roomdrop_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Resolve the roomdrop directory: an explicit path, or `~/.roomdrop`
    pub fn roomdrop_dir(config_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        match config_path {
            Some(path) => Ok(path),
            None => dirs::home_dir()
                .map(|home| home.join(ROOMDROP_DIR_NAME))
                .ok_or(StateError::NoHomeDirectory),
        }
    }

    /// Create the roomdrop directory and write a config file
    pub fn init(
        config_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let roomdrop_dir = Self::roomdrop_dir(config_path)?;
        let config_path = roomdrop_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(roomdrop_dir));
        }

        fs::create_dir_all(&roomdrop_dir)?;
        let config = config.unwrap_or_else(|| AppConfig::default_for(&roomdrop_dir));
        fs::create_dir_all(&config.data_dir)?;
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        tracing::info!("initialized roomdrop at {}", roomdrop_dir.display());

        Ok(Self {
            roomdrop_dir,
            config_path,
            config,
        })
    }

    pub fn load(config_path: Option<PathBuf>) -> Result<Self, StateError> {
        let roomdrop_dir = Self::roomdrop_dir(config_path)?;
        let config_path = roomdrop_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized(roomdrop_dir));
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            roomdrop_dir,
            config_path,
            config,
        })
    }
}
