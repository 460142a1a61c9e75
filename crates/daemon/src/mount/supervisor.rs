use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use common::{Role, SessionCredentials};

use super::status::MountStatus;

/// What to mount and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTarget {
    pub role: Role,
    /// Backing directory the helper mirrors
    pub local_mountpoint: PathBuf,
    /// User-visible mountpoint
    pub virtual_mountpoint: PathBuf,
}

impl MountTarget {
    pub fn from_credentials(creds: &SessionCredentials) -> Self {
        Self {
            role: creds.role,
            local_mountpoint: creds.local_mountpoint.clone(),
            virtual_mountpoint: creds.virtual_mountpoint.clone(),
        }
    }
}

#[async_trait]
pub trait Mounter: Send + Sync {
    /// Make the shared tree available at the target's virtual mountpoint
    async fn mount(&self, target: &MountTarget) -> MountStatus;

    /// Tear down a mount. Failures are logged, never returned.
    async fn unmount(&self, virtual_mountpoint: &Path);
}

/// Mounts by running an external helper process
#[derive(Debug, Clone)]
pub struct HelperMounter {
    helper: PathBuf,
    unmount_command: Vec<String>,
    timeout: Duration,
}

impl HelperMounter {
    pub fn new(helper: impl Into<PathBuf>, unmount_command: Vec<String>, timeout: Duration) -> Self {
        Self {
            helper: helper.into(),
            unmount_command,
            timeout,
        }
    }

    async fn run_unmount(&self, target: &Path) -> Result<(), String> {
        let (program, args) = self
            .unmount_command
            .split_first()
            .ok_or_else(|| "no unmount command configured".to_string())?;

        let output = Command::new(program)
            .args(args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => Err(failure_reason(&output.stderr, output.status)),
            Ok(Err(e)) => Err(format!("failed to run {}: {}", program, e)),
            Err(_) => Err(format!("{} timed out after {:?}", program, self.timeout)),
        }
    }
}

fn failure_reason(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", status)
    } else {
        stderr.to_string()
    }
}

#[async_trait]
impl Mounter for HelperMounter {
    async fn mount(&self, target: &MountTarget) -> MountStatus {
        // a previous session may have died without unmounting
        if let Err(reason) = self.run_unmount(&target.virtual_mountpoint).await {
            tracing::debug!(
                "no stale mount at {}: {}",
                target.virtual_mountpoint.display(),
                reason
            );
        }

        for dir in [&target.local_mountpoint, &target.virtual_mountpoint] {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                return MountStatus::Failure(format!(
                    "failed to create {}: {}",
                    dir.display(),
                    e
                ));
            }
        }

        tracing::info!(
            "mounting {} at {} ({})",
            target.local_mountpoint.display(),
            target.virtual_mountpoint.display(),
            target.role
        );

        let child = Command::new(&self.helper)
            .arg("--role")
            .arg(target.role.as_str())
            .arg("--root")
            .arg(&target.local_mountpoint)
            .arg(&target.virtual_mountpoint)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return MountStatus::Failure(format!(
                    "failed to start {}: {}",
                    self.helper.display(),
                    e
                ))
            }
        };

        // dropping the child on timeout kills it
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => MountStatus::Success,
            Ok(Ok(output)) => MountStatus::Failure(failure_reason(&output.stderr, output.status)),
            Ok(Err(e)) => MountStatus::Failure(format!("mount helper failed: {}", e)),
            Err(_) => MountStatus::Failure(format!("timed out after {:?}", self.timeout)),
        }
    }

    async fn unmount(&self, virtual_mountpoint: &Path) {
        match self.run_unmount(virtual_mountpoint).await {
            Ok(()) => tracing::info!("unmounted {}", virtual_mountpoint.display()),
            Err(reason) => tracing::warn!(
                "failed to unmount {}: {}",
                virtual_mountpoint.display(),
                reason
            ),
        }
    }
}
