//! Member path validation.
//!
//! Archive members are attacker-controlled paths. Before anything is written
//! to disk, a member name is normalized into a relative path that cannot leave
//! the extraction directory.

use crate::error::{ErrorKind, Result};
use crate::format::ArchiveFormat;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Normalize an archive member path into a safe relative path.
///
/// Absolute paths, drive prefixes, null bytes and any `..` that would climb
/// above the extraction root are rejected. `.` segments, repeated and
/// trailing separators are dropped.
///
/// ```
/// use std::path::Path;
/// use trawl_archive::sanitize_member_path;
/// assert_eq!(sanitize_member_path("docs/./a//b.txt").unwrap(), Path::new("docs/a/b.txt"));
/// assert_eq!(sanitize_member_path("docs/../b.txt").unwrap(), Path::new("b.txt"));
/// assert!(sanitize_member_path("../etc/passwd").is_err());
/// assert!(sanitize_member_path("/etc/passwd").is_err());
/// ```
pub fn sanitize_member_path(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let invalid = || ErrorKind::InvalidPath(name.display().to_string());
    let mut components = Vec::new();
    for component in name.components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(s);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

/// Pick a relative path that has not been handed out yet.
///
/// The first claim of a path returns it unchanged. Later claims of the same
/// path get a numeric suffix before the extension: `a.txt`, `a (1).txt`,
/// `a (2).txt`. Compound container suffixes stay whole, so a second
/// `inner.tar.gz` becomes `inner (1).tar.gz`.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<PathBuf>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `relative`, returning the name actually reserved and whether it
    /// had to be renamed.
    pub fn claim(&mut self, relative: &Path) -> (PathBuf, bool) {
        if self.taken.insert(relative.to_path_buf()) {
            return (relative.to_path_buf(), false);
        }
        let name = relative.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let (stem, suffix) = split_suffix(&name);
        let mut counter = 1usize;
        loop {
            let candidate = relative.with_file_name(format!("{stem} ({counter}){suffix}"));
            if self.taken.insert(candidate.clone()) {
                return (candidate, true);
            }
            counter += 1;
        }
    }
}

/// Split a file name before its extension, keeping `.tar.gz` and friends
/// together. The suffix keeps its original case and leading dot.
fn split_suffix(name: &str) -> (&str, &str) {
    let at = match ArchiveFormat::matching_suffix(name) {
        Some((suffix, _)) => name.len() - suffix.len(),
        None => match name.rfind('.') {
            Some(0) | None => name.len(),
            Some(dot) => dot,
        },
    };
    name.split_at_checked(at).unwrap_or((name, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/b/c.txt", "a/b/c.txt")]
    #[case("a//b//c", "a/b/c")]
    #[case("./a/./b", "a/b")]
    #[case("a/b/../c", "a/c")]
    #[case("dir/", "dir")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_member_path(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../escape.txt")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("/etc/passwd")]
    #[case("a\0b")]
    #[case("")]
    #[case(".")]
    #[case("./")]
    fn rejects(#[case] input: &str) {
        let err = sanitize_member_path(input).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn unique_names_suffix_duplicates() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim(Path::new("dir/a.txt")), (PathBuf::from("dir/a.txt"), false));
        assert_eq!(names.claim(Path::new("dir/a.txt")), (PathBuf::from("dir/a (1).txt"), true));
        assert_eq!(names.claim(Path::new("dir/a.txt")), (PathBuf::from("dir/a (2).txt"), true));
        assert_eq!(names.claim(Path::new("other/a.txt")), (PathBuf::from("other/a.txt"), false));
        assert_eq!(names.claim(Path::new("README")), (PathBuf::from("README"), false));
        assert_eq!(names.claim(Path::new("README")), (PathBuf::from("README (1)"), true));
    }

    #[rstest]
    #[case("inner.tar.gz", "inner (1).tar.gz")]
    #[case("nested/INNER.TGZ", "nested/INNER (1).TGZ")]
    #[case("notes.txt.gz", "notes.txt (1).gz")]
    #[case(".profile", ".profile (1)")]
    fn unique_names_keep_compound_suffixes(#[case] name: &str, #[case] renamed: &str) {
        let mut names = UniqueNames::new();
        names.claim(Path::new(name));
        assert_eq!(names.claim(Path::new(name)), (PathBuf::from(renamed), true));
    }
}
