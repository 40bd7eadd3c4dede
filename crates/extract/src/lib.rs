//! Per-file extraction: filesystem metadata plus a decoded content payload.
//!
//! The crate is organised around three pieces:
//!
//! - [`FileMetadata`](models::FileMetadata), which stats and checksums a file,
//! - the [`Decoder`] trait and its built-in implementations for text,
//!   documents and images, collected in a [`Decoders`] registry,
//! - [`ExtractionResult`](models::ExtractionResult), the normalized record
//!   that ends up in the output document.
//!
//! [`extract_file`] ties them together for a single file and never fails:
//! decoder errors become `error` results.

mod consts;
mod decode;
pub mod error;
pub mod models;

pub use crate::consts::BINARY_PREVIEW_BYTES;
pub use crate::decode::{
    Decoded, Decoder, Decoders, Decoding, DocumentDecoder, ImageDecoder, TextDecoder, TextEncoding, decode_bytes,
    decode_inline,
};
use crate::error::describe;
pub use crate::models::extension_of;
use crate::models::{ExtractionResult, FileMetadata};
use std::path::Path;
use tracing::instrument;

/// Stat, checksum and decode one file.
///
/// `display_path` overrides the recorded path (archive members use their
/// provenance path instead of the scratch location).
#[instrument(level = "debug", skip(decoder, display_path), fields(path = %path.display()))]
pub fn extract_file(path: &Path, display_path: Option<&str>, decoder: &dyn Decoder, checksums: bool) -> ExtractionResult {
    let metadata = match FileMetadata::collect(path, display_path, checksums) {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "could not read file metadata");
            return ExtractionResult::failure(FileMetadata::unreadable(path, display_path), describe(&err));
        },
    };
    match decoder.decode(path) {
        Ok(decoded) => ExtractionResult::new(metadata, decoded),
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "extraction failed");
            ExtractionResult::failure(metadata, describe(&err))
        },
    }
}
