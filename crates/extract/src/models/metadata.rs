use crate::consts::MD5_CHUNK_BYTES;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use time::OffsetDateTime;
use tracing::instrument;
use trawl_archive::ArchiveFormat;

/// Filesystem facts about a source file, independent of its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    /// Absolute path, or `<archive>/<member>` for files found inside archives.
    pub file_path: String,
    pub file_size_bytes: u64,
    /// Lower-cased, with its leading dot. Compound for `.tar.gz` and friends.
    pub file_extension: String,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub accessed_date: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
}

impl FileMetadata {
    /// Stat `path` (and checksum it when asked).
    ///
    /// `display_path` replaces the on-disk path in the record, which is how
    /// archive members keep their provenance instead of a scratch location.
    #[instrument(level = "trace", skip(display_path))]
    pub fn collect(path: &Path, display_path: Option<&str>, checksums: bool) -> Result<Self> {
        let stat = fs::metadata(path).or_raise(|| ErrorKind::Io)?;
        let md5_checksum = match checksums {
            true => Some(md5_hex(path)?),
            false => None,
        };
        Ok(Self {
            file_name: file_name_of(path),
            file_path: display_path.map(str::to_string).unwrap_or_else(|| absolute_display(path)),
            file_size_bytes: stat.len(),
            file_extension: extension_of(path),
            created_date: stat.created().ok().map(OffsetDateTime::from),
            modified_date: stat.modified().ok().map(OffsetDateTime::from),
            accessed_date: stat.accessed().ok().map(OffsetDateTime::from),
            md5_checksum,
        })
    }

    /// What can still be said about a file that cannot be stat'ed.
    pub fn unreadable(path: &Path, display_path: Option<&str>) -> Self {
        Self {
            file_name: file_name_of(path),
            file_path: display_path.map(str::to_string).unwrap_or_else(|| absolute_display(path)),
            file_size_bytes: 0,
            file_extension: extension_of(path),
            created_date: None,
            modified_date: None,
            accessed_date: None,
            md5_checksum: None,
        }
    }
}

/// Lower-cased extension with its leading dot, preferring known compound
/// container suffixes (`.tar.gz`). Empty when the name has no extension.
pub fn extension_of(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return String::new();
    };
    if let Some((suffix, _)) = ArchiveFormat::matching_suffix(name) {
        return suffix.to_string();
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{}", ext.to_lowercase()),
        None => String::new(),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn absolute_display(path: &Path) -> String {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}

fn md5_hex(path: &Path) -> Result<String> {
    let mut file = File::open(path).or_raise(|| ErrorKind::Io)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; MD5_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buffer).or_raise(|| ErrorKind::Io)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("notes.TXT", ".txt")]
    #[case("backup.tar.gz", ".tar.gz")]
    #[case("backup.TGZ", ".tgz")]
    #[case("notes.txt.gz", ".gz")]
    #[case("Makefile", "")]
    #[case(".bashrc", "")]
    fn extension(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(extension_of(name), expected);
    }

    #[test]
    fn collects_metadata_and_checksum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello world").unwrap();

        let metadata = FileMetadata::collect(&path, None, true).unwrap();
        assert_eq!(metadata.file_name, "hello.txt");
        assert_eq!(metadata.file_size_bytes, 11);
        assert_eq!(metadata.file_extension, ".txt");
        assert_eq!(metadata.md5_checksum.as_deref(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));
        assert!(metadata.modified_date.is_some());
        assert!(Path::new(&metadata.file_path).is_absolute());
    }

    #[test]
    fn display_path_and_no_checksum() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("member.txt");
        fs::write(&path, b"x").unwrap();

        let metadata = FileMetadata::collect(&path, Some("/data/bundle.zip/member.txt"), false).unwrap();
        assert_eq!(metadata.file_path, "/data/bundle.zip/member.txt");
        assert_eq!(metadata.md5_checksum, None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FileMetadata::collect(Path::new("/definitely/not/here.txt"), None, false).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
