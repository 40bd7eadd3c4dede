//! Name-based routing of files to a capability.

use std::path::Path;
use trawl_archive::ArchiveFormat;
use trawl_extract::models::Capability;

/// Decide what to do with `path` from its name alone.
///
/// Container suffixes are matched first, longest wins (`.tar.gz` before
/// `.gz`); otherwise the final extension is looked up case-insensitively.
/// Total: anything unrecognised is [`Capability::Unknown`].
pub fn resolve(path: impl AsRef<Path>) -> Capability {
    let path = path.as_ref();
    if ArchiveFormat::from_path(path).is_some() {
        return Capability::Container;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => Capability::from_extension(&ext.to_ascii_lowercase()),
        None => Capability::Unknown,
    }
}

/// Every suffix [`resolve`] maps to something other than `Unknown`, with its
/// leading dot.
pub fn supported_extensions() -> impl Iterator<Item = String> {
    ArchiveFormat::suffixes().map(str::to_string).chain(Capability::known_extensions())
}
