use std::path::{Component, Path, PathBuf};

use super::ReconcileError;

pub const PUBLIC_DIR_NAME: &str = "public";

/// Path layout of a session's shared tree
///
/// ```text
/// <root>/public/<file>          host's files
/// <root>/<guest name>/<file>    each guest's files
/// ```
///
/// Every name coming from the room is checked to be a single plain path
/// component before it is joined onto the root.
#[derive(Debug, Clone)]
pub struct VirtualTree {
    root: PathBuf,
}

impl VirtualTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join(PUBLIC_DIR_NAME)
    }

    /// Relative path of a participant's folder
    pub fn participant_dir(name: &str) -> Result<PathBuf, ReconcileError> {
        let name = validate_name(name)?;
        if name == PUBLIC_DIR_NAME {
            return Err(ReconcileError::InvalidName(name.to_string()));
        }
        Ok(PathBuf::from(name))
    }

    /// Relative path of a file inside `dir`
    pub fn entry(dir: &Path, filename: &str) -> Result<PathBuf, ReconcileError> {
        Ok(dir.join(validate_name(filename)?))
    }

    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// Accept `name` only if it is exactly one normal path component
pub fn validate_name(name: &str) -> Result<&str, ReconcileError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(name),
        _ => Err(ReconcileError::InvalidName(name.to_string())),
    }
}
