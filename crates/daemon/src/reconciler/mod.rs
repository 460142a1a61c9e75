//! Directory reconciliation
//!
//! Applies room events to the session's backing directory so the mounted tree
//! shows what the room holds. Each handler is idempotent and returns the
//! [`TreeChange`]s it actually made; an empty list means the tree already
//! matched.
//!
//! Remote files appear as empty placeholders. Content is fetched lazily by
//! the mount helper on first read.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use common::protocol::{DeleteScope, PublicFile};
use common::Role;

mod scanner;
mod tree;

pub use scanner::{LocalChange, LocalScanner};
pub use tree::{validate_name, VirtualTree, PUBLIC_DIR_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("refusing unsafe name {0:?}")]
    InvalidName(String),
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("file operation on {path} failed: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A mutation applied to the tree, relative to its root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    DirectoryCreated { path: PathBuf },
    PlaceholderCreated { path: PathBuf, author: String },
    EntryRemoved { path: PathBuf },
}

/// Result of replaying the room's existing files
#[derive(Debug, Default)]
pub struct BootstrapOutcome {
    pub changes: Vec<TreeChange>,
    /// Entries that could not be applied; the rest were
    pub skipped: Vec<ReconcileError>,
}

/// One participant's view of the shared tree
///
/// Display names are not unique in a room, so authorship is decided by uid
/// whenever the event carries one.
#[derive(Debug, Clone)]
pub struct DirectoryReconciler {
    tree: VirtualTree,
    viewer: Role,
    self_name: String,
    self_uid: Option<String>,
    host_name: String,
    host_uid: Option<String>,
}

impl DirectoryReconciler {
    pub fn new(
        root: impl Into<PathBuf>,
        viewer: Role,
        self_name: impl Into<String>,
        host_name: impl Into<String>,
    ) -> Self {
        Self {
            tree: VirtualTree::new(root),
            viewer,
            self_name: self_name.into(),
            self_uid: None,
            host_name: host_name.into(),
            host_uid: None,
        }
    }

    /// Registry uids of the viewer and the host
    pub fn with_uids(mut self, self_uid: Option<String>, host_uid: Option<String>) -> Self {
        self.self_uid = self_uid;
        self.host_uid = host_uid;
        self
    }

    fn is_self(&self, author: &str, author_uid: Option<&str>) -> bool {
        match (author_uid, self.self_uid.as_deref()) {
            (Some(uid), Some(own)) => uid == own,
            _ => author == self.self_name,
        }
    }

    fn is_host(&self, author: &str, author_uid: Option<&str>) -> bool {
        match (author_uid, self.host_uid.as_deref()) {
            (Some(uid), Some(host)) => uid == host,
            _ => author == self.host_name,
        }
    }

    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    /// Folder whose contents this viewer publishes to the room
    pub fn upload_dir(&self) -> Result<PathBuf, ReconcileError> {
        match self.viewer {
            Role::Host => Ok(self.tree.public_dir()),
            Role::Guest => Ok(self
                .tree
                .absolute(&VirtualTree::participant_dir(&self.self_name)?)),
        }
    }

    /// Create the folders every session starts with
    pub fn bootstrap_tree(&self) -> Result<Vec<TreeChange>, ReconcileError> {
        let mut changes = Vec::new();
        changes.extend(self.ensure_dir(Path::new(PUBLIC_DIR_NAME))?);
        if self.viewer == Role::Guest {
            changes.extend(self.ensure_dir(&VirtualTree::participant_dir(&self.self_name)?)?);
        }
        Ok(changes)
    }

    /// A guest is in the room
    ///
    /// The host keeps a folder per guest, whatever its name. A guest only
    /// keeps its own.
    pub fn on_participant_joined(&self, name: &str) -> Result<Vec<TreeChange>, ReconcileError> {
        let dir = VirtualTree::participant_dir(name)?;

        if self.viewer == Role::Guest && name != self.self_name {
            return Ok(Vec::new());
        }

        self.ensure_dir(&dir)
    }

    /// A file was published to the room by `author`
    ///
    /// `author_uid` is absent for files announced without one (older rooms,
    /// bootstrap lists); the display name decides then.
    pub fn on_file_added(
        &self,
        filename: &str,
        author: &str,
        author_uid: Option<&str>,
    ) -> Result<Vec<TreeChange>, ReconcileError> {
        let filename = tree::validate_name(filename)?;

        // the viewer's own uploads are already on disk
        if self.is_self(author, author_uid) {
            return Ok(Vec::new());
        }

        let dir = match self.viewer {
            Role::Host => VirtualTree::participant_dir(author)?,
            Role::Guest if self.is_host(author, author_uid) => PathBuf::from(PUBLIC_DIR_NAME),
            Role::Guest => {
                tracing::debug!("not showing {}'s file {} to a guest", author, filename);
                return Ok(Vec::new());
            }
        };

        let mut changes = self.ensure_dir(&dir)?;
        changes.extend(self.create_placeholder(&VirtualTree::entry(&dir, filename)?, author)?);
        Ok(changes)
    }

    /// A file was withdrawn from the room
    pub fn on_file_deleted(
        &self,
        filename: &str,
        scope: &DeleteScope,
    ) -> Result<Vec<TreeChange>, ReconcileError> {
        let dir = match (self.viewer, scope) {
            (Role::Guest, DeleteScope::Public) => PathBuf::from(PUBLIC_DIR_NAME),
            (Role::Host, DeleteScope::Guest(name)) => VirtualTree::participant_dir(name)?,
            // the viewer's own folder is authoritative locally
            _ => {
                tree::validate_name(filename)?;
                return Ok(Vec::new());
            }
        };

        self.remove_entry(&VirtualTree::entry(&dir, filename)?)
    }

    /// Replay every file already in the room
    ///
    /// Entries are independent, so the resulting tree does not depend on
    /// their order. Entries that fail are reported and skipped.
    pub fn on_bootstrap(&self, existing: &[PublicFile]) -> BootstrapOutcome {
        let mut outcome = BootstrapOutcome::default();
        for file in existing {
            match self.on_file_added(file.filename(), file.author(&self.host_name), None) {
                Ok(changes) => outcome.changes.extend(changes),
                Err(e) => {
                    tracing::warn!("skipping {} during bootstrap: {}", file.filename(), e);
                    outcome.skipped.push(e);
                }
            }
        }
        outcome
    }

    fn ensure_dir(&self, relative: &Path) -> Result<Vec<TreeChange>, ReconcileError> {
        let path = self.tree.absolute(relative);
        if path.is_dir() {
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(&path).map_err(|source| ReconcileError::DirectoryCreate {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("created {}", path.display());

        Ok(vec![TreeChange::DirectoryCreated {
            path: relative.to_path_buf(),
        }])
    }

    fn create_placeholder(
        &self,
        relative: &Path,
        author: &str,
    ) -> Result<Vec<TreeChange>, ReconcileError> {
        let path = self.tree.absolute(relative);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                tracing::debug!("placeholder {} by {}", path.display(), author);
                Ok(vec![TreeChange::PlaceholderCreated {
                    path: relative.to_path_buf(),
                    author: author.to_string(),
                }])
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Vec::new()),
            Err(source) => Err(ReconcileError::FileIo { path, source }),
        }
    }

    fn remove_entry(&self, relative: &Path) -> Result<Vec<TreeChange>, ReconcileError> {
        let path = self.tree.absolute(relative);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(vec![TreeChange::EntryRemoved {
                path: relative.to_path_buf(),
            }]),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(ReconcileError::FileIo { path, source }),
        }
    }
}
