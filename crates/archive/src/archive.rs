//! Opening, listing and extracting containers.
//!
//! [`Archive::open`] validates the container signature without writing
//! anything to disk. [`Archive::extract_to`] then materializes the
//! regular-file members into a caller-owned directory.
//!
//! Zip members are listed from the central directory when the archive is
//! opened. A tar has no index, so its listing is taken from whichever pass
//! over the stream happens first, extraction or [`Archive::members`], and
//! cached for the other.

use crate::error::{ErrorKind, Result};
use crate::format::{ArchiveFormat, SIGNATURE_PROBE_BYTES};
use crate::sanitize::{UniqueNames, sanitize_member_path};
use exn::{OptionExt, ResultExt};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::instrument;

/// What an archive entry is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    File,
    Directory,
    /// Symlinks, hard links, device nodes and other special entries.
    Other,
}

/// One entry as recorded in the container's index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Raw name as stored in the archive, before sanitizing.
    pub name: String,
    /// Uncompressed size, when the container records it.
    pub size: Option<u64>,
    pub kind: MemberKind,
}

#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Members larger than this are skipped instead of written.
    pub max_member_size: Option<u64>,
}

/// A member written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedMember {
    /// Raw name as stored in the archive.
    pub name: String,
    /// Sanitized path relative to the extraction directory. Differs from the
    /// sanitized name only when a duplicate had to be renamed.
    pub relative: PathBuf,
    /// Absolute location inside the extraction directory.
    pub path: PathBuf,
    pub size: u64,
}

/// A member that was not written, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedMember {
    pub name: String,
    pub reason: String,
}

/// Outcome of [`Archive::extract_to`].
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub extracted: Vec<ExtractedMember>,
    pub skipped: Vec<SkippedMember>,
    /// How many extracted members were renamed to avoid a collision.
    pub renamed: usize,
}

/// An opened and validated container.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    format: ArchiveFormat,
    members: OnceLock<Vec<Member>>,
}

impl Archive {
    /// Open the container at `path`.
    ///
    /// Fails with [`ErrorKind::UnsupportedFormat`] when the name has no known
    /// container suffix, and [`ErrorKind::Corrupt`] when the signature does
    /// not match, the zip index cannot be read, or the first tar header is
    /// unreadable. Damage further into a tar surfaces when it is listed or
    /// extracted.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ArchiveFormat::from_path(path)
            .ok_or_raise(|| ErrorKind::UnsupportedFormat(path.display().to_string()))?;

        let mut file = File::open(path).or_raise(|| ErrorKind::Io)?;
        let mut head = Vec::with_capacity(SIGNATURE_PROBE_BYTES);
        (&mut file)
            .take(SIGNATURE_PROBE_BYTES as u64)
            .read_to_end(&mut head)
            .or_raise(|| ErrorKind::Io)?;
        if !format.check_signature(&head) {
            exn::bail!(ErrorKind::Corrupt(format!("signature does not match {format}")));
        }
        file.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;

        let members = OnceLock::new();
        match format {
            ArchiveFormat::Zip => {
                let listed = list_zip(file)?;
                tracing::debug!(%format, members = listed.len(), "listed archive");
                let _ = members.set(listed);
            },
            ArchiveFormat::Tar(compression) => {
                let reader = compression.wrap_reader(BufReader::new(file))?;
                check_tar_header(reader)?;
            },
            ArchiveFormat::Stream(_) => {
                let _ = members.set(vec![Member { name: stream_member_name(path), size: None, kind: MemberKind::File }]);
            },
        }
        Ok(Self { path: path.to_path_buf(), format, members })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Every entry in the container.
    ///
    /// Reads the whole tar stream unless an extraction already has.
    pub fn members(&self) -> Result<&[Member]> {
        if let Some(members) = self.members.get() {
            return Ok(members);
        }
        let ArchiveFormat::Tar(compression) = self.format else {
            exn::bail!(ErrorKind::Corrupt(format!("{} has no member index", self.format)));
        };
        let file = File::open(&self.path).or_raise(|| ErrorKind::Io)?;
        let listed = list_tar(compression.wrap_reader(BufReader::new(file))?)?;
        tracing::debug!(format = %self.format, members = listed.len(), "listed archive");
        Ok(self.members.get_or_init(|| listed))
    }

    /// Number of regular-file members.
    pub fn file_count(&self) -> Result<usize> {
        Ok(self.members()?.iter().filter(|m| m.kind == MemberKind::File).count())
    }

    /// Write every regular-file member into `dir`.
    ///
    /// Members whose names are unsafe, that exceed the size limit, or that
    /// fail to decompress are recorded in [`Extraction::skipped`]. Only a
    /// failure of the container structure itself is returned as an error.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), dir = %dir.display()))]
    pub fn extract_to(&self, dir: &Path, options: &ExtractOptions) -> Result<Extraction> {
        let mut sink = Sink::new(dir, options);
        let file = File::open(&self.path).or_raise(|| ErrorKind::Io)?;
        match self.format {
            ArchiveFormat::Zip => {
                let mut zip = zip::ZipArchive::new(BufReader::new(file))
                    .or_raise(|| ErrorKind::Corrupt("unreadable zip directory".to_string()))?;
                for index in 0..zip.len() {
                    let mut entry = match zip.by_index(index) {
                        Ok(entry) => entry,
                        Err(err) => {
                            sink.skip(format!("#{index}"), err.to_string());
                            continue;
                        },
                    };
                    if entry.is_dir() {
                        continue;
                    }
                    let name = entry.name().to_string();
                    let size = entry.size();
                    sink.write(name, Some(size), &mut entry);
                }
            },
            ArchiveFormat::Tar(compression) => {
                let reader = compression.wrap_reader(BufReader::new(file))?;
                let mut tar = tar::Archive::new(reader);
                let entries = tar.entries().or_raise(|| ErrorKind::Corrupt("unreadable tar stream".to_string()))?;
                let mut listed = Vec::new();
                for entry in entries {
                    let mut entry = entry.or_raise(|| ErrorKind::Corrupt("unreadable tar entry".to_string()))?;
                    let member = tar_member(&entry);
                    let name = member.name.clone();
                    let kind = member.kind;
                    listed.push(member);
                    match kind {
                        MemberKind::Directory => {},
                        MemberKind::Other => sink.skip(name, "not a regular file".to_string()),
                        MemberKind::File => {
                            let size = entry.size();
                            sink.write(name, Some(size), &mut entry);
                        },
                    }
                }
                let _ = self.members.set(listed);
            },
            ArchiveFormat::Stream(compression) => {
                let mut reader = compression.wrap_reader(BufReader::new(file))?;
                sink.write(stream_member_name(&self.path), None, &mut reader);
            },
        }
        Ok(sink.finish())
    }
}

fn list_zip<R: Read + Seek>(reader: R) -> Result<Vec<Member>> {
    let mut zip = zip::ZipArchive::new(reader).or_raise(|| ErrorKind::Corrupt("unreadable zip directory".to_string()))?;
    let mut members = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip
            .by_index_raw(index)
            .or_raise(|| ErrorKind::Corrupt(format!("unreadable zip entry #{index}")))?;
        members.push(Member {
            name: entry.name().to_string(),
            size: Some(entry.size()),
            kind: match entry.is_dir() {
                true => MemberKind::Directory,
                false => MemberKind::File,
            },
        });
    }
    Ok(members)
}

fn list_tar<R: Read>(reader: R) -> Result<Vec<Member>> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar.entries().or_raise(|| ErrorKind::Corrupt("unreadable tar stream".to_string()))?;
    let mut members = Vec::new();
    for entry in entries {
        let entry = entry.or_raise(|| ErrorKind::Corrupt("unreadable tar entry".to_string()))?;
        members.push(tar_member(&entry));
    }
    Ok(members)
}

/// Decode only the first header; an empty tar is fine.
fn check_tar_header<R: Read>(reader: R) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    let mut entries = tar.entries().or_raise(|| ErrorKind::Corrupt("unreadable tar stream".to_string()))?;
    if let Some(entry) = entries.next() {
        entry.or_raise(|| ErrorKind::Corrupt("unreadable tar entry".to_string()))?;
    }
    Ok(())
}

fn tar_member<R: Read>(entry: &tar::Entry<'_, R>) -> Member {
    let entry_type = entry.header().entry_type();
    Member {
        name: entry.path().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
        size: Some(entry.size()),
        kind: if entry_type.is_file() {
            MemberKind::File
        } else if entry_type.is_dir() {
            MemberKind::Directory
        } else {
            MemberKind::Other
        },
    }
}

/// `notes.txt.gz` holds `notes.txt`.
fn stream_member_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    match ArchiveFormat::matching_suffix(&name) {
        Some((suffix, _)) => name[..name.len() - suffix.len()].to_string(),
        None => name,
    }
}

struct Sink<'a> {
    dir: &'a Path,
    options: &'a ExtractOptions,
    names: UniqueNames,
    extraction: Extraction,
}

impl<'a> Sink<'a> {
    fn new(dir: &'a Path, options: &'a ExtractOptions) -> Self {
        Self { dir, options, names: UniqueNames::new(), extraction: Extraction::default() }
    }

    fn skip(&mut self, name: String, reason: String) {
        tracing::warn!(member = %name, %reason, "skipping archive member");
        self.extraction.skipped.push(SkippedMember { name, reason });
    }

    fn write(&mut self, name: String, declared_size: Option<u64>, reader: &mut dyn Read) {
        let relative = match sanitize_member_path(&name) {
            Ok(relative) => relative,
            Err(err) => return self.skip(name, err.to_string()),
        };
        let limit = self.options.max_member_size;
        if let (Some(size), Some(limit)) = (declared_size, limit)
            && size > limit
        {
            return self.skip(name, format!("member is {size} bytes, limit is {limit}"));
        }
        let (relative, renamed) = self.names.claim(&relative);
        if renamed {
            tracing::warn!(member = %name, renamed = %relative.display(), "duplicate member name");
            self.extraction.renamed += 1;
        }
        let path = self.dir.join(&relative);
        match copy_member(reader, &path, limit) {
            Ok(Some(size)) => self.extraction.extracted.push(ExtractedMember { name, relative, path, size }),
            Ok(None) => {
                let _ = fs::remove_file(&path);
                self.skip(name, format!("member exceeds limit of {} bytes", limit.unwrap_or_default()));
            },
            Err(err) => {
                let _ = fs::remove_file(&path);
                self.skip(name, err.to_string());
            },
        }
    }

    fn finish(self) -> Extraction {
        self.extraction
    }
}

/// Copy at most `limit` bytes. `Ok(None)` means the limit was exceeded.
fn copy_member(reader: &mut dyn Read, dest: &Path, limit: Option<u64>) -> io::Result<Option<u64>> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(dest)?;
    let written = match limit {
        Some(limit) => io::copy(&mut reader.take(limit.saturating_add(1)), &mut out)?,
        None => io::copy(reader, &mut out)?,
    };
    match limit {
        Some(limit) if written > limit => Ok(None),
        _ => Ok(Some(written)),
    }
}
