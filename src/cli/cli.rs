use std::path::PathBuf;

use clap::Parser;

use crate::cli::LogLevel;

/// Shell over an in-memory virtual filesystem
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// XML description that replaces the default tree
    #[clap(long)]
    pub vfs: Option<PathBuf>,

    /// Commands to replay before the interactive prompt
    #[clap(long, short)]
    pub script: Option<PathBuf>,

    /// Settings file, defaults to ./vfsemu.yaml when present
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Directory `cd` goes to without arguments
    #[clap(long)]
    pub home: Option<String>,

    /// Exit after the script instead of reading commands from stdin
    #[clap(long)]
    pub no_interactive: bool,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "vfsemu",
            "--vfs",
            "fs.xml",
            "-s",
            "start.txt",
            "--home",
            "/root",
            "--no-interactive",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.vfs, Some(PathBuf::from("fs.xml")));
        assert_eq!(cli.script, Some(PathBuf::from("start.txt")));
        assert_eq!(cli.home.as_deref(), Some("/root"));
        assert!(cli.no_interactive);
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["vfsemu"]).unwrap();
        assert_eq!(cli.vfs, None);
        assert!(!cli.no_interactive);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }
}
