//! In-memory virtual filesystem.
//!
//! A [`Tree`] owns an arena of nodes linked by id, a cursor for the current
//! directory, and the operations the shell exposes on top of it. Trees start
//! from a fixed default layout and can be replaced wholesale by an XML
//! description through [`Tree::load`].

mod arena;
mod loader;
mod node;
mod tree;

pub use loader::{LoadError, VfsSource};
pub use tree::{DEFAULT_HOME, Tree, VfsError};
