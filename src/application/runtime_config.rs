use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Settings;
use crate::filesystem::DEFAULT_HOME;
use crate::shell::DEFAULT_PROMPT;

/// Effective options after merging the command line over the settings file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub vfs: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub home: String,
    pub prompt: String,
    pub interactive: bool,
}

impl RuntimeConfig {
    pub fn from_parts(cli: Cli, settings: Settings) -> Self {
        Self {
            vfs: cli.vfs.or(settings.vfs),
            script: cli.script.or(settings.script),
            home: cli
                .home
                .or(settings.home)
                .unwrap_or_else(|| DEFAULT_HOME.to_string()),
            prompt: settings
                .prompt
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            interactive: !cli.no_interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_without_flags_or_settings() {
        let cli = Cli::try_parse_from(["vfsemu"]).unwrap();
        let config = RuntimeConfig::from_parts(cli, Settings::default());
        assert_eq!(
            config,
            RuntimeConfig {
                vfs: None,
                script: None,
                home: DEFAULT_HOME.to_string(),
                prompt: DEFAULT_PROMPT.to_string(),
                interactive: true,
            }
        );
    }

    #[test]
    fn flags_override_settings() {
        let cli =
            Cli::try_parse_from(["vfsemu", "--vfs", "cli.xml", "--no-interactive"]).unwrap();
        let settings = Settings {
            vfs: Some(PathBuf::from("settings.xml")),
            script: Some(PathBuf::from("start.txt")),
            home: Some("/root".to_string()),
            prompt: Some("emu".to_string()),
        };
        let config = RuntimeConfig::from_parts(cli, settings);
        assert_eq!(config.vfs, Some(PathBuf::from("cli.xml")));
        assert_eq!(config.script, Some(PathBuf::from("start.txt")));
        assert_eq!(config.home, "/root");
        assert_eq!(config.prompt, "emu");
        assert!(!config.interactive);
    }
}
