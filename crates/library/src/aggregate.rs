//! Collects results into the run's single output document.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::instrument;
use trawl_extract::models::ExtractionResult;

/// Append-only sink for results, in arrival order.
#[derive(Debug, Default)]
pub struct Aggregator {
    results: Vec<ExtractionResult>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain `receiver` until every sender is gone.
    pub async fn collect(mut receiver: UnboundedReceiver<ExtractionResult>) -> Self {
        let mut aggregator = Self::new();
        while let Some(result) = receiver.recv().await {
            aggregator.push(result);
        }
        aggregator
    }

    pub fn push(&mut self, result: ExtractionResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.results
    }

    pub fn into_document(self, source_directory: impl Into<String>) -> OutputDocument {
        OutputDocument::new(source_directory, self.results)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(with = "time::serde::rfc3339")]
    pub extraction_date: OffsetDateTime,
    pub source_directory: String,
    pub total_files: usize,
    pub version: String,
}

/// The persisted artifact of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub metadata: RunMetadata,
    pub results: Vec<ExtractionResult>,
}

impl OutputDocument {
    pub fn new(source_directory: impl Into<String>, results: Vec<ExtractionResult>) -> Self {
        Self {
            metadata: RunMetadata {
                extraction_date: OffsetDateTime::now_utc(),
                source_directory: source_directory.into(),
                total_files: results.len(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            results,
        }
    }

    /// `extraction_YYYYMMDD_HHMMSS.json`, from the document's timestamp.
    pub fn file_name(&self) -> String {
        self.numbered_file_name(0)
    }

    /// [`file_name`](Self::file_name), with `_N` before the extension for
    /// every `n` above zero.
    fn numbered_file_name(&self, n: usize) -> String {
        let format = format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = self.metadata.extraction_date.format(&format).unwrap_or_else(|_| "unknown".to_string());
        match n {
            0 => format!("extraction_{stamp}.json"),
            n => format!("extraction_{stamp}_{n}.json"),
        }
    }

    /// Create a file that did not exist before. Runs finishing within the
    /// same second get `_1`, `_2`, ... instead of overwriting each other.
    fn create_output(&self, output_dir: &Path) -> io::Result<(PathBuf, File)> {
        let mut n = 0;
        loop {
            let path = output_dir.join(self.numbered_file_name(n));
            match File::create_new(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Write the document into `output_dir`, creating it if needed. An
    /// existing document is never overwritten.
    ///
    /// Returns the path written. On failure the error carries the number of
    /// results that could not be saved.
    #[instrument(level = "debug", skip_all, fields(output_dir = %output_dir.display()))]
    pub fn write(&self, output_dir: &Path, pretty: bool) -> Result<PathBuf> {
        let persist = || ErrorKind::Persist { results: self.results.len() };
        fs::create_dir_all(output_dir).or_raise(persist)?;
        let (path, file) = self.create_output(output_dir).or_raise(persist)?;
        let mut writer = BufWriter::new(file);
        match pretty {
            true => serde_json::to_writer_pretty(&mut writer, self).or_raise(persist)?,
            false => serde_json::to_writer(&mut writer, self).or_raise(persist)?,
        }
        writer.flush().or_raise(persist)?;
        tracing::info!(path = %path.display(), results = self.results.len(), "wrote output document");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use trawl_extract::Decoded;
    use trawl_extract::models::FileMetadata;

    fn result(name: &str) -> ExtractionResult {
        ExtractionResult::new(
            FileMetadata::unreadable(Path::new(name), None),
            Decoded::success(json!({ "text": name })),
        )
    }

    #[tokio::test]
    async fn collects_in_arrival_order() {
        let (sender, receiver) = mpsc::unbounded_channel();
        let collector = tokio::spawn(Aggregator::collect(receiver));
        for name in ["b.txt", "a.txt", "c.txt"] {
            sender.send(result(name)).unwrap();
        }
        drop(sender);
        let names: Vec<_> =
            collector.await.unwrap().into_results().into_iter().map(|r| r.metadata.file_name).collect();
        assert_eq!(names, ["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn empty_document() {
        let document = Aggregator::new().into_document("/data");
        assert_eq!(document.metadata.total_files, 0);
        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["results"], json!([]));
        assert_eq!(value["metadata"]["source_directory"], "/data");
    }

    #[test]
    fn file_name_format() {
        let mut document = OutputDocument::new("/data", Vec::new());
        document.metadata.extraction_date = time::macros::datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(document.file_name(), "extraction_20240305_070809.json");
    }

    #[test]
    fn writes_document() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out");
        let mut aggregator = Aggregator::new();
        aggregator.push(result("a.txt"));
        aggregator.push(result("b.txt"));
        let document = aggregator.into_document("/data");

        let path = document.write(&output, true).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["total_files"], 2);
        assert_eq!(value["metadata"]["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn same_second_runs_do_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let mut first = OutputDocument::new("/data", vec![result("a.txt")]);
        first.metadata.extraction_date = time::macros::datetime!(2024-03-05 07:08:09 UTC);
        let mut second = OutputDocument::new("/data", vec![result("b.txt"), result("c.txt")]);
        second.metadata.extraction_date = first.metadata.extraction_date;

        let first_path = first.write(temp.path(), false).unwrap();
        let second_path = second.write(temp.path(), false).unwrap();
        let third_path = second.write(temp.path(), false).unwrap();

        assert!(first_path.ends_with("extraction_20240305_070809.json"));
        assert!(second_path.ends_with("extraction_20240305_070809_1.json"));
        assert!(third_path.ends_with("extraction_20240305_070809_2.json"));
        let kept: Value = serde_json::from_str(&fs::read_to_string(&first_path).unwrap()).unwrap();
        assert_eq!(kept["metadata"]["total_files"], 1);
    }

    #[test]
    fn write_failure_reports_result_count() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let document = OutputDocument::new("/data", vec![result("a.txt")]);

        let err = document.write(&blocker, false).unwrap_err();
        assert_eq!(*err, ErrorKind::Persist { results: 1 });
    }
}
