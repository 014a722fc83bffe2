//! Line-oriented front end over the filesystem: parses commands, runs them
//! against a [`Tree`](crate::filesystem::Tree) and renders the results.

mod command;
mod editor;
mod script;
mod shell;

pub use script::{Script, ScriptError};
pub use shell::{DEFAULT_PROMPT, Flow, Shell};
