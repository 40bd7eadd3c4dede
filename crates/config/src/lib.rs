//! Layered configuration for trawl.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform config
//!    directory (e.g. `~/.config/trawl/` on Linux),
//! 3. an explicit file passed on the command line,
//! 4. environment variables prefixed with `TRAWL_` (`TRAWL_WORKERS=4`).
//!
//! The result is validated once and then passed around by reference.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "TRAWL_";
const MIB: u64 = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the output document is written into.
    pub output_dir: PathBuf,
    /// Number of concurrent extraction workers.
    pub workers: usize,
    /// Containers found at this depth are reported but not unpacked.
    pub max_archive_depth: u32,
    pub recursive: bool,
    pub skip_empty: bool,
    pub skip_hidden: bool,
    /// Glob-style names (`*` and `?` wildcards, case-insensitive) that are
    /// never scanned.
    pub skip_patterns: Vec<String>,
    /// Files (and archive members) larger than this many bytes are ignored.
    pub max_file_size: u64,
    /// Compute an MD5 checksum for every file.
    pub checksums: bool,
    /// Pretty-print the output document.
    pub pretty: bool,
    /// Root for archive scratch directories. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            workers: 8,
            max_archive_depth: 10,
            recursive: true,
            skip_empty: true,
            skip_hidden: true,
            skip_patterns: ["thumbs.db", "desktop.ini", ".ds_store", "~$*", "*.pyc", "*.tmp", "*.swp", "__pycache__"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_size: 500 * MIB,
            checksums: true,
            pretty: true,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load, merge and validate every configuration source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// Build the merged source stack without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = ProjectDirs::from("", "", "trawl") {
            let dir = dirs.config_dir();
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration from an arbitrary source stack.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers must be at least 1".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("output_dir must not be empty".to_string()));
        }
        if self.max_file_size == 0 {
            exn::bail!(ErrorKind::Invalid("max_file_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// An explicitly requested file must exist, and its format is picked from the
/// extension.
fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", path.display())));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unrecognised config format: {}", path.display()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn from_file(name: &str, contents: &str) -> Result<Config> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(name);
        fs::write(&path, contents).unwrap();
        let figment = merge_file(Figment::from(Serialized::defaults(Config::default())), &path)?;
        Config::from_figment(figment)
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 8);
        assert_eq!(config.max_archive_depth, 10);
        assert_eq!(config.max_file_size, 500 * 1024 * 1024);
        assert!(config.skip_patterns.iter().any(|p| p == "*.tmp"));
    }

    #[rstest]
    #[case("trawl.toml", "workers = 3\nmax_archive_depth = 2\n")]
    #[case("trawl.yaml", "workers: 3\nmax_archive_depth: 2\n")]
    #[case("trawl.json", r#"{"workers": 3, "max_archive_depth": 2}"#)]
    fn explicit_file_overrides_defaults(#[case] name: &str, #[case] contents: &str) {
        let config = from_file(name, contents).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_archive_depth, 2);
        assert!(config.recursive);
    }

    #[test]
    fn zero_workers_is_invalid() {
        let err = from_file("trawl.toml", "workers = 0\n").unwrap_err();
        assert!(matches!(*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn empty_output_dir_is_invalid() {
        let config = Config { output_dir: PathBuf::new(), ..Config::default() };
        assert!(matches!(*config.validate().unwrap_err(), ErrorKind::Invalid(_)));
    }

    #[test]
    fn malformed_file_fails_to_load() {
        let err = from_file("trawl.toml", "workers = \"many\"\n").unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn missing_or_unknown_explicit_file() {
        let temp = TempDir::new().unwrap();
        let figment = Figment::new();
        assert!(merge_file(figment.clone(), &temp.path().join("absent.toml")).is_err());
        let ini = temp.path().join("trawl.ini");
        fs::write(&ini, "workers=1").unwrap();
        assert!(merge_file(figment, &ini).is_err());
    }
}
