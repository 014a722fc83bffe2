use std::io::{self, IsTerminal, Write};
use std::path::Path;

use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use snafu::prelude::*;
use supports_color::Stream;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::cli::Cli;
use crate::config::{Settings, SettingsError};
use crate::ext::AsyncTryFrom;
use crate::filesystem::{LoadError, Tree, VfsSource};
use crate::shell::{Flow, Script, ScriptError, Shell};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let settings = Settings::read(cli.config.as_deref())
            .await
            .context(SettingsSnafu)?;
        debug!("Loaded settings: {:?}", settings);
        let config = RuntimeConfig::from_parts(cli, settings);
        debug!("Runtime config: {:?}", config);

        let mut tree = Tree::with_home(config.home.clone());
        if let Some(path) = &config.vfs {
            // A broken source is reported and the default tree stays in use
            if let Err(err) = Self::load_source(&mut tree, path).await {
                debug!("VFS load failed: {:?}", err);
                eprintln!("error: {err}");
            }
        }

        let color = supports_color::on(Stream::Stdout).is_some();
        colored::control::set_override(color);
        let mut shell = Shell::new(tree)
            .with_prompt(config.prompt.clone())
            .with_color(color);
        let mut stdout = io::stdout().lock();

        if let Some(path) = &config.script {
            let script = Script::async_try_from(path.as_path())
                .await
                .context(ScriptSnafu)?;
            info!("Replaying script {}", script.path.display());
            let flow = shell
                .run_script(&script.text, &mut stdout)
                .context(TerminalSnafu)?;
            if flow == Flow::Exit {
                return Ok(());
            }
        }

        if config.interactive {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                writeln!(stdout, "VFS emulator {}", env!("CARGO_PKG_VERSION"))
                    .context(TerminalSnafu)?;
                writeln!(stdout, "Type 'help' for commands, 'exit' to quit")
                    .context(TerminalSnafu)?;
                let mut editor: Editor<(), DefaultHistory> =
                    Editor::new().context(EditorSnafu)?;
                shell
                    .run_editor(&mut editor, &mut stdout)
                    .context(TerminalSnafu)?;
            } else {
                debug!("Standard input is not a terminal, reading lines as-is");
                shell
                    .run_interactive(stdin.lock(), &mut stdout)
                    .context(TerminalSnafu)?;
            }
        }

        Ok(())
    }

    async fn load_source(tree: &mut Tree, path: &Path) -> Result<(), LoadError> {
        let source = VfsSource::async_try_from(path).await?;
        tree.load(&source.text)?;
        info!(
            "Loaded VFS from {} ({})",
            source.path.display(),
            tree.info()
        );
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while reading settings"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Critical failure encountered while reading the script"))]
    ScriptError { source: ScriptError },
    #[snafu(display("Failed to set up line editing on the terminal"))]
    EditorError { source: ReadlineError },
    #[snafu(display("Failed to write to the terminal"))]
    TerminalError { source: io::Error },
}
