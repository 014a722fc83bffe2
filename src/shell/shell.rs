use std::io::{self, BufRead, Write};

use colored::Colorize;
use rustyline::error::ReadlineError;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use super::command::Command;
use super::editor::LineEditor;
use crate::ext::DurationExt;
use crate::filesystem::{Tree, VfsError};

pub const DEFAULT_PROMPT: &str = "vfs";

/// Result of one successfully executed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(Vec<String>),
    Exit,
}

/// Whether a run loop ended because of `exit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    tree: Tree,
    prompt: String,
    color: bool,
}

impl Shell {
    pub fn new(tree: Tree) -> Self {
        Shell {
            tree,
            prompt: DEFAULT_PROMPT.to_string(),
            color: false,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn prompt(&self) -> String {
        let prompt = format!("{}:{}$ ", self.prompt, self.tree.current_path());
        if self.color {
            prompt.green().bold().to_string()
        } else {
            prompt
        }
    }

    pub fn execute(&mut self, line: &str) -> Result<Outcome, ShellError> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Outcome::Output(Vec::new()));
        };
        debug!("Executing {:?}", command);

        let output = match command {
            Command::Pwd => vec![self.tree.current_path()],
            Command::Ls { path, detailed } => {
                self.tree.list(path.as_deref(), detailed).context(VfsSnafu)?
            }
            Command::Cd { path } => {
                self.tree.change_directory(path.as_deref()).context(VfsSnafu)?;
                Vec::new()
            }
            Command::Cat { path } => {
                let content = self.tree.read(&path).context(VfsSnafu)?;
                if content.is_empty() {
                    Vec::new()
                } else {
                    vec![content.to_string()]
                }
            }
            Command::Touch { name } => {
                self.tree.touch(&name).context(VfsSnafu)?;
                Vec::new()
            }
            Command::VfsInfo => vec![self.tree.info().to_string()],
            Command::Uptime => vec![format!(
                "up {}, {} users",
                self.tree.uptime().to_clock_string(),
                self.tree.sessions().len()
            )],
            Command::Who => self
                .tree
                .sessions()
                .into_iter()
                .map(|session| {
                    let line = format!(
                        "{:<8} {:<8} {}",
                        session.user, session.terminal, session.login_time
                    );
                    match session.host {
                        Some(host) => format!("{line} ({host})"),
                        None => line,
                    }
                })
                .collect(),
            Command::Help => Command::summary()
                .iter()
                .map(|(usage, description)| format!("  {usage:<16} {description}"))
                .collect(),
            Command::Exit => return Ok(Outcome::Exit),
        };
        Ok(Outcome::Output(output))
    }

    /// Replays `script`, echoing each line after the prompt. Failing lines
    /// print their error and replay continues.
    pub fn run_script<W: Write>(&mut self, script: &str, out: &mut W) -> io::Result<Flow> {
        for line in script.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            writeln!(out, "{}{}", self.prompt(), line)?;
            if self.run_line(line, out)? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Prompts and executes lines from `input` until `exit` or end of input
    pub fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{}", self.prompt())?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            if self.run_line(&line, out)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Drives a terminal session through a line editor. Ctrl-C drops the
    /// current line, Ctrl-D ends the session.
    pub fn run_editor<E: LineEditor, W: Write>(
        &mut self,
        editor: &mut E,
        out: &mut W,
    ) -> io::Result<()> {
        loop {
            let prompt = self.prompt();
            match editor.read_line(&prompt) {
                Ok(line) => {
                    if self.run_line(&line, out)? == Flow::Exit {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    writeln!(out, "^C")?;
                }
                Err(ReadlineError::Eof) => {
                    writeln!(out)?;
                    return Ok(());
                }
                Err(ReadlineError::Io(err)) => return Err(err),
                Err(err) => return Err(io::Error::other(err.to_string())),
            }
        }
    }

    fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        match self.execute(line) {
            Ok(Outcome::Output(lines)) => {
                for output in lines {
                    out.write_all(output.as_bytes())?;
                    if !output.ends_with('\n') {
                        writeln!(out)?;
                    }
                }
                Ok(Flow::Continue)
            }
            Ok(Outcome::Exit) => Ok(Flow::Exit),
            Err(err) => {
                let message = format!("error: {err}");
                if self.color {
                    writeln!(out, "{}", message.red())?;
                } else {
                    writeln!(out, "{message}")?;
                }
                Ok(Flow::Continue)
            }
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ShellError {
    #[snafu(display("unknown command: '{}'", name))]
    UnknownCommand { name: String },
    #[snafu(display("usage: {}", usage))]
    Usage { usage: String },
    #[snafu(display("{}", source))]
    Vfs { source: VfsError },
}
