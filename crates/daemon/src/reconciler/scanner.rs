use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A change the participant made in their own upload folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalChange {
    /// New or modified file, to be published
    Upserted(PathBuf),
    /// File gone from the folder, to be withdrawn
    Removed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// Polls a folder and reports what changed since the previous poll
///
/// The first scan only records what is already there.
#[derive(Debug)]
pub struct LocalScanner {
    dir: PathBuf,
    known: HashMap<String, Fingerprint>,
    seeded: bool,
}

/// Desktop and VCS artefacts that should never be published
pub fn is_ignored(name: &str) -> bool {
    name.starts_with('.')
        || name.ends_with('~')
        || name.contains(".goutputstream")
        || name.contains(".Trash")
        || name.contains(".git")
}

impl LocalScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            known: HashMap::new(),
            seeded: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn scan(&mut self) -> io::Result<Vec<LocalChange>> {
        let current = self.list().await?;
        let mut changes = Vec::new();

        if self.seeded {
            for (name, fingerprint) in &current {
                if self.known.get(name) != Some(fingerprint) {
                    changes.push(LocalChange::Upserted(self.dir.join(name)));
                }
            }
            for name in self.known.keys() {
                if !current.contains_key(name) {
                    changes.push(LocalChange::Removed(name.clone()));
                }
            }
        } else {
            tracing::debug!(
                "seeded scanner for {} with {} files",
                self.dir.display(),
                current.len()
            );
            self.seeded = true;
        }

        self.known = current;
        Ok(changes)
    }

    async fn list(&self) -> io::Result<HashMap<String, Fingerprint>> {
        let mut files = HashMap::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_ignored(&name) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // removed between listing and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if !metadata.is_file() {
                continue;
            }

            files.insert(
                name,
                Fingerprint {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                },
            );
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ignored_names() {
        for name in [".DS_Store", ".goutputstream-XYZ1", "notes.txt~", ".Trash-1000", ".git"] {
            assert!(is_ignored(name), "{}", name);
        }
        assert!(!is_ignored("notes.txt"));
    }

    #[tokio::test]
    async fn test_first_scan_is_silent_then_reports_changes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("existing.txt"), b"a").unwrap();

        let mut scanner = LocalScanner::new(dir.path());
        assert!(scanner.scan().await.unwrap().is_empty());

        std::fs::write(dir.path().join("new.txt"), b"b").unwrap();
        std::fs::write(dir.path().join(".goutputstream-1"), b"tmp").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        assert_eq!(
            scanner.scan().await.unwrap(),
            vec![LocalChange::Upserted(dir.path().join("new.txt"))]
        );

        // nothing changed
        assert!(scanner.scan().await.unwrap().is_empty());

        std::fs::remove_file(dir.path().join("existing.txt")).unwrap();
        // a size change is visible even within mtime granularity
        std::fs::write(dir.path().join("new.txt"), b"longer").unwrap();
        let mut changes = scanner.scan().await.unwrap();
        changes.sort_by_key(|c| format!("{:?}", c));
        assert_eq!(
            changes,
            vec![
                LocalChange::Removed("existing.txt".to_string()),
                LocalChange::Upserted(dir.path().join("new.txt")),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_folder_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut scanner = LocalScanner::new(dir.path().join("absent"));
        assert!(scanner.scan().await.unwrap().is_empty());
        assert!(scanner.scan().await.unwrap().is_empty());
    }
}
