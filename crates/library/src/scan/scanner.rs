use crate::dispatch;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::SkipPatterns;
use exn::ResultExt;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use trawl_config::Config;
use trawl_extract::extension_of;
use walkdir::{DirEntry, WalkDir};

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub recursive: bool,
    pub skip_empty: bool,
    pub skip_hidden: bool,
    pub skip_patterns: SkipPatterns,
    pub max_file_size: u64,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> LibraryResult<Self> {
        Ok(Self {
            recursive: config.recursive,
            skip_empty: config.skip_empty,
            skip_hidden: config.skip_hidden,
            skip_patterns: SkipPatterns::new(&config.skip_patterns).or_raise(|| LibraryErrorKind::Scan)?,
            max_file_size: config.max_file_size,
        })
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            skip_empty: true,
            skip_hidden: true,
            skip_patterns: SkipPatterns::empty(),
            max_file_size: u64::MAX,
        }
    }
}

/// Decides which files are worth a task.
#[derive(Clone, Debug)]
pub struct Scanner {
    options: ScanOptions,
    supported: HashSet<String>,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options, supported: dispatch::supported_extensions().collect() }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Lazily walk `root`, yielding every qualifying file.
    ///
    /// Unreadable entries are logged and left out. Calling this again walks
    /// the tree again.
    pub fn scan<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        let max_depth = match self.options.recursive {
            true => usize::MAX,
            false => 1,
        };
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            // The root itself is always entered, even when it looks hidden.
            .filter_entry(move |entry| entry.depth() == 0 || !self.prune(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(path = ?err.path(), error = %err, "excluding unreadable entry");
                    None
                },
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| self.accepts_with(entry.path(), true))
            .map(DirEntry::into_path)
    }

    /// Filter an explicit list of files.
    ///
    /// Unlike [`scan`](Self::scan), unsupported extensions are kept so they
    /// reach the pipeline and are counted as skipped.
    pub fn filter_files(&self, files: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        files.into_iter().filter(|path| self.accepts_with(path, false)).collect()
    }

    /// Whether a single file qualifies, extension included.
    pub fn accepts(&self, path: &Path) -> bool {
        self.accepts_with(path, true)
    }

    /// Hidden and skip-listed directories are not descended into.
    fn prune(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        (self.options.skip_hidden && name.starts_with('.'))
            || (entry.file_type().is_dir() && self.options.skip_patterns.matches(&name))
    }

    fn accepts_with(&self, path: &Path, check_extension: bool) -> bool {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "excluding unreadable file");
                return false;
            },
        };
        if !metadata.is_file() {
            return false;
        }
        if check_extension && !self.supported.contains(&extension_of(path)) {
            tracing::trace!(path = %path.display(), "unsupported extension");
            return false;
        }
        if self.options.skip_empty && metadata.len() == 0 {
            tracing::debug!(path = %path.display(), "skipping empty file");
            return false;
        }
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if self.options.skip_patterns.matches(&name) {
            tracing::debug!(path = %path.display(), "skipping by pattern");
            return false;
        }
        if self.options.skip_hidden && name.starts_with('.') {
            tracing::debug!(path = %path.display(), "skipping hidden file");
            return false;
        }
        if metadata.len() > self.options.max_file_size {
            tracing::warn!(path = %path.display(), size = metadata.len(), "skipping oversized file");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scanner() -> Scanner {
        Scanner::new(ScanOptions {
            skip_patterns: SkipPatterns::new(["*.tmp", "__pycache__"]).unwrap(),
            ..ScanOptions::default()
        })
    }

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.TAR.GZ"), "not really").unwrap();
        fs::write(root.join("c.xyz"), "unsupported").unwrap();
        fs::write(root.join("empty.txt"), "").unwrap();
        fs::write(root.join("junk.tmp"), "junk").unwrap();
        fs::write(root.join(".secret.txt"), "hidden").unwrap();
        fs::write(root.join("sub/d.md"), "# d").unwrap();
        fs::write(root.join("sub/deeper/e.json"), "{}").unwrap();
        fs::write(root.join(".hidden/f.txt"), "f").unwrap();
        fs::write(root.join("__pycache__/g.txt"), "g").unwrap();
        temp
    }

    fn names(paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
        let mut names: Vec<_> =
            paths.into_iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        names.sort();
        names
    }

    #[test]
    fn recursive_scan_applies_filters() {
        let temp = tree();
        let found = names(scanner().scan(temp.path()));
        assert_eq!(found, ["a.txt", "b.TAR.GZ", "d.md", "e.json"]);
    }

    #[test]
    fn non_recursive_scan_stays_at_top_level() {
        let temp = tree();
        let scanner = Scanner::new(ScanOptions { recursive: false, ..scanner().options().clone() });
        assert_eq!(names(scanner.scan(temp.path())), ["a.txt", "b.TAR.GZ"]);
    }

    #[test]
    fn scan_is_restartable() {
        let temp = tree();
        let scanner = scanner();
        assert_eq!(names(scanner.scan(temp.path())), names(scanner.scan(temp.path())));
    }

    #[test]
    fn size_limit_and_empty_files() {
        let temp = tree();
        fs::write(temp.path().join("big.txt"), vec![b'x'; 100]).unwrap();
        let scanner = Scanner::new(ScanOptions { max_file_size: 50, skip_empty: false, ..ScanOptions::default() });
        let found = names(scanner.scan(temp.path()));
        assert!(found.contains(&"empty.txt".to_string()));
        assert!(!found.contains(&"big.txt".to_string()));
    }

    #[test]
    fn explicit_files_keep_unsupported_extensions() {
        let temp = tree();
        let files = ["a.txt", "c.xyz", "empty.txt", "junk.tmp", "missing.txt"].map(|n| temp.path().join(n));
        assert_eq!(names(scanner().filter_files(files)), ["a.txt", "c.xyz"]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(scanner().scan(&temp.path().join("nope")).count(), 0);
    }
}
