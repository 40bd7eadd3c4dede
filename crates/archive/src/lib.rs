//! Container detection, listing and sandboxed extraction.
//!
//! This crate knows how to recognise and unpack the container formats trawl
//! recurses into:
//!
//! - **Format detection** from file names ([`ArchiveFormat::from_path`]), with
//!   the longest suffix winning so `.tar.gz` beats `.gz`
//! - **Signature validation** before any member is read
//! - **Listing** members without touching the disk ([`Archive::open`])
//! - **Extraction** into a caller-owned directory with path sanitizing,
//!   size limits and duplicate renaming ([`Archive::extract_to`])
//!
//! Zip, tar and single-file streams are supported. Bzip2 and Gzip are always
//! available; Brotli, XZ and Zstd are behind feature flags.

mod archive;
mod codec;
pub mod error;
mod format;
mod sanitize;

pub use crate::archive::{Archive, ExtractOptions, ExtractedMember, Extraction, Member, MemberKind, SkippedMember};
pub use crate::codec::Compression;
pub use crate::format::{ArchiveFormat, SIGNATURE_PROBE_BYTES};
pub use crate::sanitize::{UniqueNames, sanitize_member_path};
