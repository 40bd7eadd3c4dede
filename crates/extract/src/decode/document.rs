use super::{Decoded, Decoder};
use crate::consts::RTF_CONTROL_REGEX;
use crate::error::{ErrorKind, Result};
use crate::models::extension_of;
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};
use exn::ResultExt;
use serde_json::{Value, json};
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::instrument;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const RTF_MAGIC: &[u8] = b"{\\rtf";
const NOTE: &str = "only the text runs of this format are read";

/// PDFs, Word documents and their relatives.
///
/// The leading bytes must match the format the extension claims. PDF and
/// DOCX bodies are decoded in full; `.doc`, `.odt` and `.rtf` get a
/// best-effort text pass and a `partial` status.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentDecoder;

impl Decoder for DocumentDecoder {
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    fn decode(&self, path: &Path) -> Result<Decoded> {
        let bytes = fs::read(path).or_raise(|| ErrorKind::Io)?;
        match extension_of(path).as_str() {
            ".pdf" => {
                check(&bytes, PDF_MAGIC, "pdf")?;
                pdf(&bytes).map(Decoded::success)
            },
            ".docx" => {
                check(&bytes, ZIP_MAGIC, "docx")?;
                docx(&bytes).map(Decoded::success)
            },
            ".odt" => {
                check(&bytes, ZIP_MAGIC, "odt")?;
                Ok(Decoded::partial(json!({ "format": "odt", "container": "odf", "text": null }), NOTE))
            },
            ".doc" => {
                check(&bytes, OLE_MAGIC, "doc")?;
                Ok(Decoded::partial(json!({ "format": "doc", "container": "ole", "text": null }), NOTE))
            },
            ".rtf" => {
                check(&bytes, RTF_MAGIC, "rtf")?;
                let text = rtf_text(&String::from_utf8_lossy(&bytes));
                Ok(Decoded::partial(json!({ "format": "rtf", "text": text }), NOTE))
            },
            other => exn::bail!(ErrorKind::Decode(format!("no document format for extension {other:?}"))),
        }
    }
}

fn check(head: &[u8], magic: &[u8], format: &'static str) -> Result<()> {
    match head.starts_with(magic) {
        true => Ok(()),
        false => exn::bail!(ErrorKind::Signature(format)),
    }
}

fn pdf(bytes: &[u8]) -> Result<Value> {
    // Malformed fonts can panic deep inside the parser.
    let text = match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => exn::bail!(ErrorKind::Decode(format!("unreadable PDF body: {err}"))),
        Err(_) => exn::bail!(ErrorKind::Decode("PDF parser panicked on this file".to_string())),
    };
    let text = clean(&text);
    Ok(json!({
        "format": "pdf",
        "version": pdf_version(bytes),
        "words": text.split_whitespace().count(),
        "text": text,
        "extraction_method": "pdf-extract",
    }))
}

/// `%PDF-1.7` → `1.7`.
fn pdf_version(head: &[u8]) -> Value {
    let version: String = head[PDF_MAGIC.len()..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| char::from(b))
        .collect();
    match version.is_empty() {
        true => Value::Null,
        false => Value::String(version),
    }
}

fn docx(bytes: &[u8]) -> Result<Value> {
    let document = match docx_rs::read_docx(bytes) {
        Ok(document) => document,
        Err(err) => exn::bail!(ErrorKind::Decode(format!("unreadable DOCX body: {err}"))),
    };
    let mut paragraphs = Vec::new();
    let mut tables = Vec::new();
    for child in &document.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(&paragraph.children);
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            },
            DocumentChild::Table(table) => {
                let rows: Vec<Vec<String>> = table
                    .rows
                    .iter()
                    .map(|row| {
                        let TableChild::TableRow(row) = row;
                        row.cells
                            .iter()
                            .map(|cell| {
                                let TableRowChild::TableCell(cell) = cell;
                                let parts: Vec<String> = cell
                                    .children
                                    .iter()
                                    .filter_map(|content| match content {
                                        TableCellContent::Paragraph(paragraph) => {
                                            Some(paragraph_text(&paragraph.children))
                                        },
                                        _ => None,
                                    })
                                    .collect();
                                parts.join("\n")
                            })
                            .collect()
                    })
                    .collect();
                tables.push(rows);
            },
            _ => {},
        }
    }
    let text = paragraphs.join("\n");
    Ok(json!({
        "format": "docx",
        "words": text.split_whitespace().count(),
        "text": text,
        "paragraphs": paragraphs,
        "tables": tables,
        "extraction_method": "docx-rs",
    }))
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            ParagraphChild::Run(run) => run_text(&run.children, &mut text),
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let ParagraphChild::Run(run) = inner {
                        run_text(&run.children, &mut text);
                    }
                }
            },
            _ => {},
        }
    }
    text
}

fn run_text(children: &[RunChild], out: &mut String) {
    for child in children {
        match child {
            RunChild::Text(text) => out.push_str(&text.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {},
        }
    }
}

fn rtf_text(raw: &str) -> String {
    let stripped = RTF_CONTROL_REGEX.replace_all(raw, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every line and drop the empty ones.
fn clean(text: &str) -> String {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}
