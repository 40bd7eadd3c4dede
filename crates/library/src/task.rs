use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// One file waiting to be classified and extracted.
#[derive(Clone, Debug)]
pub struct FileTask {
    /// Where the file can be read right now.
    pub path: PathBuf,
    /// Number of archive boundaries crossed to reach this file.
    pub depth: u32,
    /// The archive this file was unpacked from, if any.
    pub scope: Option<Arc<ArchiveScope>>,
    /// Path recorded in the result, when it differs from `path`.
    pub display_path: Option<String>,
}

impl FileTask {
    /// A file found directly on disk.
    pub fn root(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), depth: 0, scope: None, display_path: None }
    }

    /// A file unpacked from `scope`, one level deeper than the archive.
    pub fn member(path: PathBuf, relative: &Path, scope: &Arc<ArchiveScope>) -> Self {
        Self {
            path,
            depth: scope.depth() + 1,
            display_path: Some(scope.provenance().join(relative).display().to_string()),
            scope: Some(Arc::clone(scope)),
        }
    }

    /// The path that identifies this file in logs and results.
    pub fn display(&self) -> String {
        self.display_path.clone().unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// The scratch directory one archive was unpacked into.
///
/// Shared by every task created from the archive's members. The directory
/// is deleted when the last of them is dropped, which is after its member
/// has been fully processed.
pub struct ArchiveScope {
    dir: TempDir,
    depth: u32,
    provenance: PathBuf,
}

impl ArchiveScope {
    pub fn new(dir: TempDir, depth: u32, provenance: impl Into<PathBuf>) -> Self {
        Self { dir, depth, provenance: provenance.into() }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Depth of the archive itself (its members sit at `depth + 1`).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Path of the archive as it should appear in results.
    pub fn provenance(&self) -> &Path {
        &self.provenance
    }
}

impl fmt::Debug for ArchiveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveScope")
            .field("dir", &self.dir.path())
            .field("depth", &self.depth)
            .field("provenance", &self.provenance)
            .finish()
    }
}

impl Drop for ArchiveScope {
    fn drop(&mut self) {
        tracing::trace!(
            dir = %self.dir.path().display(),
            archive = %self.provenance.display(),
            "removing archive scratch directory"
        );
    }
}

/// Accepts new work while a run is in progress.
///
/// Implementations must account for the task in the run's total before it
/// can be picked up by a worker.
pub trait TaskSubmitter: Send + Sync {
    fn submit(&self, task: FileTask);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_tasks_carry_provenance_and_depth() {
        let dir = TempDir::new().unwrap();
        let scope = Arc::new(ArchiveScope::new(dir, 2, "/data/outer.zip"));
        let task = FileTask::member(scope.dir().join("a/b.txt"), Path::new("a/b.txt"), &scope);
        assert_eq!(task.depth, 3);
        assert_eq!(task.display(), "/data/outer.zip/a/b.txt");
        assert_eq!(task.file_name(), "b.txt");
    }

    #[test]
    fn scratch_dir_lives_until_last_task_is_dropped() {
        let scope = Arc::new(ArchiveScope::new(TempDir::new().unwrap(), 0, "/data/a.zip"));
        let dir = scope.dir().to_path_buf();
        let first = FileTask::member(dir.join("x"), Path::new("x"), &scope);
        let second = FileTask::member(dir.join("y"), Path::new("y"), &scope);
        drop(scope);
        assert!(dir.exists());
        drop(first);
        assert!(dir.exists());
        drop(second);
        assert!(!dir.exists());
    }
}
