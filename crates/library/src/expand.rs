//! Recursive archive expansion.
//!
//! An archive moves through `Opened → Listed → Extracting → Done`, or stops
//! early as `Failed` (bad signature or structure) or `Truncated` (nested too
//! deep). Members the [`Scanner`] accepts are handed back to the pipeline as
//! new tasks; everything else is decoded inline into the archive's own
//! result.

use crate::scan::Scanner;
use crate::task::{ArchiveScope, FileTask, TaskSubmitter};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;
use trawl_archive::{Archive, ExtractOptions, Extraction};
use trawl_extract::decode_inline;
use trawl_extract::error::describe;
use trawl_extract::models::{ExtractionResult, FileMetadata};

const SCRATCH_PREFIX: &str = "trawl-";

/// Unpacks containers and feeds their members back into a run.
#[derive(Clone, Debug)]
pub struct ArchiveExpander {
    scanner: Arc<Scanner>,
    max_depth: u32,
    temp_root: Option<PathBuf>,
    checksums: bool,
    max_member_size: u64,
}

impl ArchiveExpander {
    pub fn new(
        scanner: Arc<Scanner>,
        max_depth: u32,
        temp_root: Option<PathBuf>,
        checksums: bool,
        max_member_size: u64,
    ) -> Self {
        Self { scanner, max_depth, temp_root, checksums, max_member_size }
    }

    /// Expand the archive behind `task`, submitting accepted members.
    ///
    /// Always returns exactly one result for the archive itself. The scratch
    /// directory is gone by the time this returns, unless members were
    /// submitted; then it lives until the last of them has been processed.
    #[instrument(level = "debug", skip_all, fields(path = %task.display(), depth = task.depth))]
    pub fn expand(&self, task: &FileTask, submitter: &dyn TaskSubmitter) -> ExtractionResult {
        let shown = task.display();
        let metadata = match FileMetadata::collect(&task.path, task.display_path.as_deref(), self.checksums) {
            Ok(metadata) => metadata,
            Err(err) => {
                return ExtractionResult::failure(
                    FileMetadata::unreadable(&task.path, task.display_path.as_deref()),
                    describe(&err),
                );
            },
        };

        // Opened and Listed.
        let archive = match Archive::open(&task.path) {
            Ok(archive) => archive,
            Err(err) => {
                tracing::error!(path = %shown, error = %err, "cannot open archive");
                return ExtractionResult::failure(metadata, describe(&err));
            },
        };
        let format = archive.format().to_string();

        // Truncated.
        if task.depth >= self.max_depth {
            tracing::warn!(path = %shown, depth = task.depth, max_depth = self.max_depth, "archive nesting limit reached");
            let (total_members, file_members) = match member_counts(&archive) {
                Ok(counts) => counts,
                Err(err) => {
                    tracing::error!(path = %shown, error = %err, "cannot list archive");
                    return ExtractionResult::failure(metadata, describe(&err));
                },
            };
            let content = json!({
                "archive_format": format,
                "total_members": total_members,
                "file_members": file_members,
                "truncated": true,
                "max_depth": self.max_depth,
            });
            return ExtractionResult::new(
                metadata,
                trawl_extract::Decoded::partial(
                    content,
                    format!("archive nesting depth limit of {} reached; members were not extracted", self.max_depth),
                ),
            );
        }

        // Extracting.
        let scratch = match self.scratch_dir() {
            Ok(dir) => dir,
            Err(err) => {
                tracing::error!(path = %shown, error = %err, "cannot create scratch directory");
                return ExtractionResult::failure(metadata, format!("cannot create scratch directory: {err}"));
            },
        };
        let options = ExtractOptions { max_member_size: Some(self.max_member_size) };
        let extraction = match archive.extract_to(scratch.path(), &options) {
            Ok(extraction) => extraction,
            Err(err) => {
                tracing::error!(path = %shown, error = %err, "archive extraction failed");
                return ExtractionResult::failure(metadata, describe(&err));
            },
        };

        // Tar listings were cached by the extraction pass.
        let (total_members, file_members) = match member_counts(&archive) {
            Ok(counts) => counts,
            Err(err) => return ExtractionResult::failure(metadata, describe(&err)),
        };

        let (children, inline): (Vec<_>, Vec<_>) =
            extraction.extracted.iter().partition(|member| self.scanner.accepts(&member.path));
        let inline_members: Vec<Value> = inline
            .iter()
            .map(|member| {
                let content = fs::read(&member.path).map(|bytes| decode_inline(&bytes)).unwrap_or_else(
                    |err| json!({ "error": err.to_string() }),
                );
                json!({ "name": member.relative.display().to_string(), "size": member.size, "content": content })
            })
            .collect();
        let resubmitted: Vec<String> = children.iter().map(|m| m.relative.display().to_string()).collect();

        let content = json!({
            "archive_format": format,
            "total_members": total_members,
            "file_members": file_members,
            "extracted": extraction.extracted.len(),
            "resubmitted_members": resubmitted,
            "inline_members": inline_members,
            "skipped_members": skipped(&extraction),
            "renamed": extraction.renamed,
        });
        let decoded = summarize(content, &extraction);

        // Hand the scratch directory to the children; without any, it is
        // removed when `scratch` drops at the end of this call.
        if !children.is_empty() {
            let scope = Arc::new(ArchiveScope::new(scratch, task.depth, PathBuf::from(&metadata.file_path)));
            for member in &children {
                submitter.submit(FileTask::member(member.path.clone(), &member.relative, &scope));
            }
        }
        tracing::info!(
            path = %shown,
            members = total_members,
            resubmitted = resubmitted.len(),
            inline = inline_members.len(),
            "expanded archive"
        );
        ExtractionResult::new(metadata, decoded)
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

fn member_counts(archive: &Archive) -> trawl_archive::error::Result<(usize, usize)> {
    Ok((archive.members()?.len(), archive.file_count()?))
}

fn skipped(extraction: &Extraction) -> Vec<Value> {
    extraction.skipped.iter().map(|s| json!({ "name": s.name, "reason": s.reason })).collect()
}

fn summarize(content: Value, extraction: &Extraction) -> trawl_extract::Decoded {
    match (extraction.extracted.is_empty(), extraction.skipped.len()) {
        (_, 0) => trawl_extract::Decoded::success(content),
        (true, skipped) => trawl_extract::Decoded {
            content,
            status: trawl_extract::models::Status::Error,
            error_message: Some(format!("none of the {skipped} members could be extracted")),
        },
        (false, skipped) => trawl_extract::Decoded::partial(content, format!("{skipped} members were skipped")),
    }
}

#[cfg(test)]
pub(crate) fn is_scratch_root_empty(root: &std::path::Path) -> bool {
    fs::read_dir(root).map(|mut entries| entries.next().is_none()).unwrap_or(true)
}
