use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const TEXT_EXTENSIONS: &[&str] = &[
    // Plain text
    "txt", "text", "log", "logs",
    // Data formats
    "csv", "tsv", "json", "jsonl", "jsn", "xml", "yaml", "yml", "toml", "ini", "conf", "cfg", "config",
    // Web
    "html", "htm", "css", "scss", "sass", "less", "svg",
    // Code
    "js", "jsx", "ts", "tsx", "py", "pyw", "java", "cpp", "c", "h", "hpp", "cs", "php", "rb", "go", "rs", "swift", "kt",
    "scala",
    // Shell and scripts
    "sh", "bash", "zsh", "bat", "cmd", "ps1", "psm1",
    // Other
    "sql", "r", "m", "dockerfile", "env", "gitignore", "editorconfig", "properties", "gradle",
    // Markdown
    "md", "markdown", "mdown", "mkd", "mdx",
];
pub(crate) const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "odt", "rtf"];
pub(crate) const IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "jpe", "jif", "jfif", "gif", "bmp", "tif", "tiff", "webp", "ico"];

pub(crate) const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd", "mdx"];

/// Hex dumps of undecodable content stop after this many input bytes.
pub const BINARY_PREVIEW_BYTES: usize = 64 * 1024;
pub(crate) const CSV_PREVIEW_ROWS: usize = 100;
pub(crate) const LOG_SAMPLE_LINES: usize = 10;
pub(crate) const XML_TAG_PREVIEW: usize = 20;
pub(crate) const MD5_CHUNK_BYTES: usize = 8 * 1024;

selector!(ANY_ELEMENT_SELECTOR, "*");
regex!(MARKDOWN_FRONTMATTER_REGEX, r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n");
regex!(RTF_CONTROL_REGEX, r"\\[a-zA-Z]+-?\d* ?|\\[^a-zA-Z]|[{}]");
