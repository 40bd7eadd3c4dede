use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use trawl_extract::extension_of;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    pub count: usize,
    pub bytes: u64,
}

/// Totals over a set of scanned files. Order of insertion does not matter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    /// Keyed by lower-cased extension (`""` for files without one).
    pub by_extension: BTreeMap<String, ExtensionStats>,
}

impl ScanSummary {
    /// Stat every path. Files that vanished since the scan count with size 0.
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let mut summary = Self::default();
        for path in paths {
            let path = path.as_ref();
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            summary.add(&extension_of(path), size);
        }
        summary
    }

    pub fn add(&mut self, extension: &str, bytes: u64) {
        self.total_files += 1;
        self.total_bytes += bytes;
        let stats = self.by_extension.entry(extension.to_string()).or_default();
        stats.count += 1;
        stats.bytes += bytes;
    }

    pub fn total_size_human(&self) -> String {
        human_size(self.total_bytes)
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} files, {}", self.total_files, self.total_size_human())?;
        for (extension, stats) in &self.by_extension {
            let extension = match extension.as_str() {
                "" => "(none)",
                ext => ext,
            };
            write!(f, "\n  {extension}: {} ({})", stats.count, human_size(stats.bytes))?;
        }
        Ok(())
    }
}

/// `1536` → `1.50 KB`.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}
