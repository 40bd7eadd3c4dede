use crate::codec::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::LazyLock;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_BLOCK: usize = 512;

/// Number of leading bytes needed to validate any container signature.
pub const SIGNATURE_PROBE_BYTES: usize = TAR_BLOCK;

/// Known container suffixes, longest first within each family so that the
/// compound `.tar.gz` is always preferred over the shorter `.gz`.
static SUFFIXES: LazyLock<Vec<(&'static str, ArchiveFormat)>> = LazyLock::new(|| {
    let mut suffixes = vec![
        (".tar.gz", ArchiveFormat::Tar(Compression::Gzip)),
        (".tar.bz2", ArchiveFormat::Tar(Compression::Bzip2)),
        (".tgz", ArchiveFormat::Tar(Compression::Gzip)),
        (".tbz2", ArchiveFormat::Tar(Compression::Bzip2)),
        (".tbz", ArchiveFormat::Tar(Compression::Bzip2)),
        (".tar", ArchiveFormat::Tar(Compression::None)),
        (".zip", ArchiveFormat::Zip),
        (".gz", ArchiveFormat::Stream(Compression::Gzip)),
        (".bz2", ArchiveFormat::Stream(Compression::Bzip2)),
    ];
    #[cfg(feature = "xz")]
    suffixes.extend([
        (".tar.xz", ArchiveFormat::Tar(Compression::Xz)),
        (".txz", ArchiveFormat::Tar(Compression::Xz)),
        (".xz", ArchiveFormat::Stream(Compression::Xz)),
    ]);
    #[cfg(feature = "zstd")]
    suffixes.extend([
        (".tar.zst", ArchiveFormat::Tar(Compression::Zstd)),
        (".tzst", ArchiveFormat::Tar(Compression::Zstd)),
        (".zst", ArchiveFormat::Stream(Compression::Zstd)),
    ]);
    #[cfg(feature = "brotli")]
    suffixes.push((".br", ArchiveFormat::Stream(Compression::Brotli)));
    suffixes
});

/// A container layout trawl knows how to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Zip archive (random access, per-member compression).
    Zip,
    /// Tar archive, optionally wrapped in a stream codec.
    Tar(Compression),
    /// A single compressed file (`notes.txt.gz`), which holds exactly one
    /// member named after the archive without its codec suffix.
    Stream(Compression),
}

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::Tar(Compression::None) => write!(f, "tar"),
            ArchiveFormat::Tar(compression) => write!(f, "tar+{compression}"),
            ArchiveFormat::Stream(compression) => write!(f, "{compression}"),
        }
    }
}

impl ArchiveFormat {
    /// Detect the container format from a file name (case-insensitive).
    ///
    /// A bare suffix such as `.gz` is a dotfile with no extension, and is not
    /// considered a container.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        Self::from_name(name)
    }

    /// Same as [`from_path`](Self::from_path), on a bare file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::matching_suffix(name).map(|(_, format)| format)
    }

    /// The longest known container suffix of `name`, with its format.
    ///
    /// A name that is nothing but a suffix (`.tar.gz`) has no match, rather
    /// than falling back to a shorter one.
    #[must_use]
    pub fn matching_suffix(name: &str) -> Option<(&'static str, Self)> {
        let name = name.to_lowercase();
        SUFFIXES
            .iter()
            .filter(|(suffix, _)| name.ends_with(suffix))
            .max_by_key(|(suffix, _)| suffix.len())
            .filter(|(suffix, _)| name.len() > suffix.len())
            .map(|(suffix, format)| (*suffix, *format))
    }

    /// Every suffix recognised as a container, for building supported sets.
    pub fn suffixes() -> impl Iterator<Item = &'static str> {
        SUFFIXES.iter().map(|(suffix, _)| *suffix)
    }

    /// Check the leading bytes of a file against this format's signature.
    #[must_use]
    pub fn check_signature(&self, head: &[u8]) -> bool {
        match self {
            ArchiveFormat::Zip => head.starts_with(&ZIP_MAGIC) || head.starts_with(&ZIP_EMPTY_MAGIC),
            ArchiveFormat::Tar(Compression::None) => {
                head.len() >= TAR_BLOCK && head[TAR_MAGIC_OFFSET..].starts_with(TAR_MAGIC)
            },
            ArchiveFormat::Tar(compression) | ArchiveFormat::Stream(compression) => {
                compression.check_magic_bytes(head)
            },
        }
    }
}
