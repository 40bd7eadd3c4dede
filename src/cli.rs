use clap::{ArgAction, Parser};
use std::path::PathBuf;
use trawl_config::Config;

/// Extract metadata and content from every file under a directory,
/// archives included, into one JSON document.
#[derive(Debug, Parser)]
#[command(name = "trawl", version, about)]
pub struct Cli {
    /// Directory (or single file) to extract. Prompted for when omitted.
    pub path: Option<PathBuf>,
    /// Extra configuration file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Directory the output document is written into.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
    /// Number of concurrent extraction workers.
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,
    /// Maximum archive nesting depth to unpack.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<u32>,
    /// Only look at the top level of the directory.
    #[arg(long)]
    pub no_recursive: bool,
    /// Skip MD5 checksums.
    #[arg(long)]
    pub no_checksums: bool,
    /// More logging: -v for debug, -vv for trace. RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags win over every configuration source.
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(depth) = self.max_depth {
            config.max_archive_depth = depth;
        }
        if self.no_recursive {
            config.recursive = false;
        }
        if self.no_checksums {
            config.checksums = false;
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["trawl"], "info")]
    #[case(&["trawl", "-v"], "debug")]
    #[case(&["trawl", "-vv"], "trace")]
    #[case(&["trawl", "-vvvv"], "trace")]
    fn verbosity(#[case] args: &[&str], #[case] expected: &str) {
        assert_eq!(Cli::try_parse_from(args).unwrap().log_level(), expected);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "trawl",
            "/data",
            "--output",
            "/out",
            "--workers",
            "3",
            "--max-depth",
            "1",
            "--no-recursive",
            "--no-checksums",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(cli.path, Some(PathBuf::from("/data")));
        assert_eq!(config.output_dir, PathBuf::from("/out"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_archive_depth, 1);
        assert!(!config.recursive);
        assert!(!config.checksums);
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["trawl"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
        assert!(cli.path.is_none());
    }
}
