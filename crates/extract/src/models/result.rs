use super::{FileMetadata, Status};
use crate::decode::Decoded;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// The normalized record produced for one processed file.
///
/// Built once by the pipeline and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file_id: Uuid,
    #[serde(flatten)]
    pub metadata: FileMetadata,
    pub content: Value,
    pub extraction_status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub extraction_timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of archive boundaries crossed to reach this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_depth: Option<u32>,
    /// Path of the archive this file was unpacked from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_archive: Option<String>,
}

impl ExtractionResult {
    pub fn new(metadata: FileMetadata, decoded: Decoded) -> Self {
        Self {
            file_id: Uuid::new_v4(),
            metadata,
            content: decoded.content,
            extraction_status: decoded.status,
            extraction_timestamp: OffsetDateTime::now_utc(),
            error_message: decoded.error_message,
            archive_depth: None,
            source_archive: None,
        }
    }

    /// An `error` result carrying only the failure message.
    pub fn failure(metadata: FileMetadata, message: impl Into<String>) -> Self {
        Self::new(metadata, Decoded::failure(message))
    }

    /// Record where this file came from when it was found inside an archive.
    pub fn with_provenance(mut self, depth: u32, source_archive: impl Into<String>) -> Self {
        self.archive_depth = Some(depth);
        self.source_archive = Some(source_archive.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> FileMetadata {
        FileMetadata {
            file_name: "a.txt".to_string(),
            file_path: "/tmp/a.txt".to_string(),
            file_size_bytes: 3,
            file_extension: ".txt".to_string(),
            created_date: None,
            modified_date: Some(OffsetDateTime::UNIX_EPOCH),
            accessed_date: None,
            md5_checksum: None,
        }
    }

    #[test]
    fn serializes_flat_with_optional_fields_omitted() {
        let result = ExtractionResult::new(metadata(), Decoded::success(json!({"text": "abc"})));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["file_name"], "a.txt");
        assert_eq!(value["extraction_status"], "success");
        assert_eq!(value["modified_date"], "1970-01-01T00:00:00Z");
        assert_eq!(value["content"]["text"], "abc");
        for absent in ["created_date", "md5_checksum", "error_message", "archive_depth", "source_archive"] {
            assert!(value.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn failure_and_provenance() {
        let result = ExtractionResult::failure(metadata(), "boom").with_provenance(2, "/tmp/outer.zip");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["extraction_status"], "error");
        assert_eq!(value["error_message"], "boom");
        assert_eq!(value["archive_depth"], 2);
        assert_eq!(value["source_archive"], "/tmp/outer.zip");

        let back: ExtractionResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
