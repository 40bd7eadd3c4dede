//! Lightweight structure for well-known text formats.

use crate::consts::{
    ANY_ELEMENT_SELECTOR, CSV_PREVIEW_ROWS, LOG_SAMPLE_LINES, MARKDOWN_EXTENSIONS, MARKDOWN_FRONTMATTER_REGEX,
    XML_TAG_PREVIEW,
};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use scraper::Html;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Add format-specific fields to `content`. Returns a message when the text
/// claims a format it does not actually follow.
pub(crate) fn annotate(extension: &str, text: &str, content: &mut Map<String, Value>) -> Option<String> {
    match extension {
        "json" | "jsn" => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                content.insert("json_data".to_string(), value);
                None
            },
            Err(err) => Some(format!("invalid JSON: {err}")),
        },
        "jsonl" => {
            let (values, problem) = json_lines(text);
            content.insert("json_data".to_string(), Value::Array(values));
            problem
        },
        "csv" => {
            content.insert("csv_data".to_string(), delimited(text, ','));
            None
        },
        "tsv" => {
            content.insert("csv_data".to_string(), delimited(text, '\t'));
            None
        },
        "log" | "logs" => {
            content.insert("log_entries".to_string(), log(text));
            None
        },
        "html" | "htm" => {
            content.insert("xml_structure".to_string(), tags(&Html::parse_document(text), true));
            None
        },
        "xml" | "svg" => {
            content.insert("xml_structure".to_string(), tags(&Html::parse_fragment(text), false));
            None
        },
        ext if MARKDOWN_EXTENSIONS.contains(&ext) => {
            content.insert("markdown".to_string(), markdown(text));
            None
        },
        _ => None,
    }
}

fn json_lines(text: &str) -> (Vec<Value>, Option<String>) {
    let mut values = Vec::new();
    let mut problem = None;
    for (number, line) in text.lines().enumerate().filter(|(_, line)| !line.trim().is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => values.push(value),
            Err(err) => {
                problem.get_or_insert_with(|| format!("invalid JSON on line {}: {err}", number + 1));
            },
        }
    }
    (values, problem)
}

fn delimited(text: &str, delimiter: char) -> Value {
    let mut lines = text.lines().filter(|line| !line.is_empty());
    let headers: Vec<&str> = lines.next().map(|line| line.split(delimiter).map(str::trim).collect()).unwrap_or_default();
    let rows: Vec<Vec<&str>> = lines.map(|line| line.split(delimiter).map(str::trim).collect()).collect();
    json!({
        "headers": headers,
        "row_count": rows.len(),
        "rows": rows.iter().take(CSV_PREVIEW_ROWS).collect::<Vec<_>>(),
    })
}

fn log(text: &str) -> Value {
    let lines: Vec<&str> = text.split('\n').collect();
    json!({
        "total_lines": lines.len(),
        "first_line": lines.first().copied().unwrap_or_default(),
        "last_line": lines.last().copied().unwrap_or_default(),
        "sample_lines": lines.iter().take(LOG_SAMPLE_LINES).collect::<Vec<_>>(),
    })
}

/// Element names in document order. A fragment's synthetic root is left out.
fn tags(html: &Html, include_root: bool) -> Value {
    let root = html.root_element().id();
    let all: Vec<&str> = html
        .select(&ANY_ELEMENT_SELECTOR)
        .filter(|element| include_root || element.id() != root)
        .map(|element| element.value().name())
        .collect();
    let unique: BTreeSet<&str> = all.iter().copied().collect();
    json!({
        "root_tags": unique.into_iter().take(XML_TAG_PREVIEW).collect::<Vec<_>>(),
        "total_tags": all.len(),
    })
}

/// What is being collected between a start and end event.
enum Open {
    Heading { line: usize, level: usize, text: String },
    Code { language: String, code: String },
}

fn markdown(text: &str) -> Value {
    let (frontmatter, body) = match MARKDOWN_FRONTMATTER_REGEX.captures(text) {
        Some(captures) => {
            let whole = captures.get(0).map_or(0, |m| m.end());
            (captures.get(1).map(|m| m.as_str()), &text[whole..])
        },
        None => (None, text),
    };

    let mut headings = Vec::new();
    let mut code_blocks = Vec::new();
    let mut open: Option<Open> = None;
    for (event, range) in Parser::new(body).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading(level, ..)) if open.is_none() => {
                let line = body[..range.start].matches('\n').count() + 1;
                open = Some(Open::Heading { line, level: level as usize, text: String::new() });
            },
            Event::Start(Tag::CodeBlock(kind)) if open.is_none() => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or("text").to_string(),
                    CodeBlockKind::Indented => "text".to_string(),
                };
                open = Some(Open::Code { language, code: String::new() });
            },
            Event::Text(part) | Event::Code(part) => match &mut open {
                Some(Open::Heading { text, .. }) => text.push_str(&part),
                Some(Open::Code { code, .. }) => code.push_str(&part),
                None => {},
            },
            Event::End(Tag::Heading(..) | Tag::CodeBlock(_)) => match open.take() {
                Some(Open::Heading { line, level, text }) => {
                    headings.push(json!({ "line": line, "level": level, "text": text.trim() }));
                },
                Some(Open::Code { language, code }) => {
                    code_blocks.push(json!({
                        "index": code_blocks.len() + 1,
                        "language": language,
                        "code": code.trim(),
                    }));
                },
                None => {},
            },
            _ => {},
        }
    }

    json!({
        "frontmatter": frontmatter,
        "headings": headings,
        "code_blocks": code_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(extension: &str, text: &str) -> (Map<String, Value>, Option<String>) {
        let mut content = Map::new();
        let problem = annotate(extension, text, &mut content);
        (content, problem)
    }

    #[test]
    fn json_is_parsed() {
        let (content, problem) = run("json", r#"{"a": [1, 2]}"#);
        assert!(problem.is_none());
        assert_eq!(content["json_data"], json!({"a": [1, 2]}));
    }

    #[test]
    fn invalid_json_is_reported() {
        let (content, problem) = run("json", "{not json");
        assert!(problem.unwrap().starts_with("invalid JSON"));
        assert!(!content.contains_key("json_data"));
    }

    #[test]
    fn json_lines_keep_valid_lines() {
        let (content, problem) = run("jsonl", "{\"a\":1}\n\n{\"b\":2}\nnope\n");
        assert_eq!(content["json_data"], json!([{"a": 1}, {"b": 2}]));
        assert!(problem.unwrap().contains("line 4"));
    }

    #[test]
    fn csv_headers_and_rows() {
        let (content, _) = run("csv", "name,age\nada,36\ngrace,85\n");
        assert_eq!(content["csv_data"]["headers"], json!(["name", "age"]));
        assert_eq!(content["csv_data"]["row_count"], 2);
        assert_eq!(content["csv_data"]["rows"][1], json!(["grace", "85"]));
    }

    #[test]
    fn log_lines() {
        let (content, _) = run("log", "start\nmiddle\nend");
        assert_eq!(content["log_entries"]["total_lines"], 3);
        assert_eq!(content["log_entries"]["first_line"], "start");
        assert_eq!(content["log_entries"]["last_line"], "end");
    }

    #[test]
    fn html_tags_include_implied_elements() {
        let (content, _) = run("html", "<html><body><p>a</p><p>b</p></body></html>");
        assert_eq!(content["xml_structure"]["root_tags"], json!(["body", "head", "html", "p"]));
        assert_eq!(content["xml_structure"]["total_tags"], 5);
    }

    #[test]
    fn xml_tags_leave_out_the_fragment_root() {
        let (content, _) = run("xml", r#"<catalog><book id="1"><name>A</name></book><book></book></catalog>"#);
        assert_eq!(content["xml_structure"]["root_tags"], json!(["book", "catalog", "name"]));
        assert_eq!(content["xml_structure"]["total_tags"], 4);
    }

    #[test]
    fn tags_in_comments_and_text_are_not_counted() {
        let (content, _) = run("xml", "<root><!-- <ghost> -->a &lt;b&gt; c</root>");
        assert_eq!(content["xml_structure"]["root_tags"], json!(["root"]));
        assert_eq!(content["xml_structure"]["total_tags"], 1);
    }

    #[test]
    fn markdown_structure() {
        let text = "---\ntitle: Notes\n---\n# Title\n\nSome text\n\n## Section ##\n```rust\n# not a heading\nfn main() {}\n```\n";
        let (content, _) = run("md", text);
        let markdown = &content["markdown"];
        assert_eq!(markdown["frontmatter"], "title: Notes");
        assert_eq!(markdown["headings"].as_array().unwrap().len(), 2);
        assert_eq!(markdown["headings"][0], json!({"line": 1, "level": 1, "text": "Title"}));
        assert_eq!(markdown["headings"][1]["text"], "Section");
        assert_eq!(markdown["code_blocks"][0]["language"], "rust");
        assert_eq!(markdown["code_blocks"][0]["code"], "# not a heading\nfn main() {}");
    }

    #[test]
    fn markdown_setext_headings_and_inline_code() {
        let text = "Intro `cfg`\n=====\n\n    indented();\n\n~~~\nplain\n~~~\n";
        let (content, _) = run("markdown", text);
        let markdown = &content["markdown"];
        assert!(markdown["frontmatter"].is_null());
        assert_eq!(markdown["headings"][0], json!({"line": 1, "level": 1, "text": "Intro cfg"}));
        assert_eq!(markdown["code_blocks"][0], json!({"index": 1, "language": "text", "code": "indented();"}));
        assert_eq!(markdown["code_blocks"][1]["code"], "plain");
    }

    #[test]
    fn other_extensions_are_untouched() {
        let (content, problem) = run("rs", "fn main() {}");
        assert!(content.is_empty());
        assert!(problem.is_none());
    }
}
