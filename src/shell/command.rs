use snafu::ensure;

use super::shell::{ShellError, UnknownCommandSnafu, UsageSnafu};

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pwd,
    Ls { path: Option<String>, detailed: bool },
    Cd { path: Option<String> },
    Cat { path: String },
    Touch { name: String },
    VfsInfo,
    Uptime,
    Who,
    Help,
    Exit,
}

impl Command {
    /// Parses a line split on whitespace. Blank lines and `#` comments yield
    /// `None`; the command name is case-insensitive.
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        if name.starts_with('#') {
            return Ok(None);
        }
        let args: Vec<&str> = tokens.collect();

        let command = match name.to_lowercase().as_str() {
            "pwd" => no_args(Command::Pwd, "pwd", &args)?,
            "ls" => Self::parse_ls(&args)?,
            "cd" => {
                ensure!(args.len() <= 1, UsageSnafu { usage: "cd [path]" });
                Command::Cd {
                    path: args.first().map(|arg| arg.to_string()),
                }
            }
            "cat" => Command::Cat {
                path: single_arg(&args, "cat <path>")?,
            },
            "touch" => Command::Touch {
                name: single_arg(&args, "touch <name>")?,
            },
            "vfsinfo" => no_args(Command::VfsInfo, "vfsinfo", &args)?,
            "uptime" => no_args(Command::Uptime, "uptime", &args)?,
            "who" => no_args(Command::Who, "who", &args)?,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => return UnknownCommandSnafu { name }.fail(),
        };
        Ok(Some(command))
    }

    fn parse_ls(args: &[&str]) -> Result<Self, ShellError> {
        const USAGE: &str = "ls [-l] [path]";
        let mut detailed = false;
        let mut path = None;
        for arg in args {
            match *arg {
                "-l" => detailed = true,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return UsageSnafu { usage: USAGE }.fail();
                }
                other => {
                    ensure!(path.is_none(), UsageSnafu { usage: USAGE });
                    path = Some(other.to_string());
                }
            }
        }
        Ok(Command::Ls { path, detailed })
    }

    /// Name and one-line description of every command, for `help`
    pub fn summary() -> &'static [(&'static str, &'static str)] {
        &[
            ("pwd", "print the current directory"),
            ("ls [-l] [path]", "list a directory, -l for details"),
            ("cd [path]", "change directory, home when no path is given"),
            ("cat <path>", "print a file"),
            ("touch <name>", "create an empty file or refresh its time"),
            ("vfsinfo", "count files and directories"),
            ("uptime", "time since the filesystem was created"),
            ("who", "list logged in users"),
            ("help", "show this help"),
            ("exit", "leave the shell"),
        ]
    }
}

fn no_args(command: Command, usage: &'static str, args: &[&str]) -> Result<Command, ShellError> {
    ensure!(args.is_empty(), UsageSnafu { usage });
    Ok(command)
}

fn single_arg(args: &[&str], usage: &'static str) -> Result<String, ShellError> {
    match args {
        [arg] => Ok(arg.to_string()),
        _ => UsageSnafu { usage }.fail(),
    }
}
