//! Builds a tree from the XML description consumed by `--vfs`.
//!
//! ```xml
//! <vfs>
//!   <directory name="etc" permissions="rwxr-x---" owner="root" group="root">
//!     <file name="motd" size="12">Hello there</file>
//!   </directory>
//! </vfs>
//! ```

use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use compio::fs;
use roxmltree::{Document, Node as XmlNode};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, warn};

use super::arena::{Arena, CannotAddChildError, Clock};
use super::node::{Encoding, Metadata, Node, NodeId, is_path_component};
use crate::ext::{AsyncTryFrom, BestEffortPathExt};

pub const ROOT_TAG: &str = "vfs";
const DIRECTORY_TAG: &str = "directory";
const FILE_TAG: &str = "file";

/// Raw text of a source file read from the host filesystem
#[derive(Debug, Clone)]
pub struct VfsSource {
    pub path: PathBuf,
    pub text: String,
}

impl AsyncTryFrom<&Path> for VfsSource {
    type Error = LoadError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        debug!("Reading VFS source {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSourceSnafu {
            path: path.best_effort_path_display(),
        })?;
        let text = String::from_utf8(bytes).context(NotUtf8Snafu {
            path: path.best_effort_path_display(),
        })?;

        Ok(VfsSource {
            path: path.to_path_buf(),
            text,
        })
    }
}

/// Parses `source` into a fresh arena whose timestamps continue from `clock`.
///
/// Nothing outside the returned arena is touched, so a failure at any depth
/// leaves the caller's tree as it was.
pub fn parse_source(source: &str, clock: Clock) -> Result<Arena, LoadError> {
    let document = Document::parse(source).context(MalformedMarkupSnafu)?;
    let root_element = document.root_element();
    ensure!(
        root_element.has_tag_name(ROOT_TAG),
        RootTagMismatchSnafu {
            found: root_element.tag_name().name(),
        }
    );

    let mut arena = Arena::with_clock(clock);
    let root = arena.root();
    let mut builder = Builder {
        document: &document,
        arena: &mut arena,
    };
    builder.parse_children(root, root_element)?;
    Ok(arena)
}

struct Builder<'a, 'input> {
    document: &'a Document<'input>,
    arena: &'a mut Arena,
}

impl Builder<'_, '_> {
    fn parse_children(&mut self, parent: NodeId, element: XmlNode) -> Result<(), LoadError> {
        for child in element.children().filter(|n| n.is_element()) {
            let id = match child.tag_name().name() {
                DIRECTORY_TAG => self.parse_directory(child)?,
                FILE_TAG => self.parse_file(child)?,
                other => {
                    warn!(
                        "Skipping unknown element <{}> at line {}",
                        other,
                        self.line(child)
                    );
                    continue;
                }
            };
            self.arena.add_child(parent, id).context(StructureSnafu)?;
        }
        Ok(())
    }

    /// Builds the whole subtree before handing it back for linking
    fn parse_directory(&mut self, element: XmlNode) -> Result<NodeId, LoadError> {
        let name = self.name_of(element)?;
        let now = self.arena.now();
        let mut node = Node::directory(name, now);
        apply_ownership(&mut node.metadata, element);

        let id = self.arena.insert(node);
        self.parse_children(id, element)?;
        Ok(id)
    }

    fn parse_file(&mut self, element: XmlNode) -> Result<NodeId, LoadError> {
        let name = self.name_of(element)?;
        let content = element.text().map(str::trim).unwrap_or_default();

        let encoding = match element.attribute("encoding") {
            Some(value) => Encoding::parse(value).context(UnknownEncodingSnafu {
                name: name.as_str(),
                value,
            })?,
            None => Encoding::Text,
        };

        let now = self.arena.now();
        let mut node = Node::file(name.as_str(), content, now).with_encoding(encoding);
        apply_ownership(&mut node.metadata, element);
        if let Some(value) = element.attribute("size") {
            node.metadata.size = value.trim().parse::<u64>().context(InvalidSizeSnafu {
                name: name.as_str(),
                value,
            })?;
        }

        Ok(self.arena.insert(node))
    }

    fn name_of(&self, element: XmlNode) -> Result<String, LoadError> {
        let name = element.attribute("name").context(MissingNameSnafu {
            element: element.tag_name().name(),
            line: self.line(element),
        })?;
        ensure!(
            is_path_component(name),
            InvalidNameSnafu {
                name,
                line: self.line(element),
            }
        );
        Ok(name.to_string())
    }

    fn line(&self, element: XmlNode) -> u32 {
        self.document.text_pos_at(element.range().start).row
    }
}

fn apply_ownership(metadata: &mut Metadata, element: XmlNode) {
    if let Some(permissions) = element.attribute("permissions") {
        metadata.permissions = permissions.to_string();
    }
    if let Some(owner) = element.attribute("owner") {
        metadata.owner = owner.to_string();
    }
    if let Some(group) = element.attribute("group") {
        metadata.group = group.to_string();
    }
}

#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("Failed to read the VFS source: {}", path))]
    ReadSourceError {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("VFS source {} is not valid UTF-8", path))]
    NotUtf8Error { path: String, source: FromUtf8Error },
    #[snafu(display("Malformed VFS markup: {}", source))]
    MalformedMarkupError { source: roxmltree::Error },
    #[snafu(display("Expected root element <{}>, found <{}>", ROOT_TAG, found))]
    RootTagMismatch { found: String },
    #[snafu(display("<{}> at line {} is missing the 'name' attribute", element, line))]
    MissingName { element: String, line: u32 },
    #[snafu(display("Invalid name '{}' at line {}", name, line))]
    InvalidName { name: String, line: u32 },
    #[snafu(display("Invalid size '{}' for file '{}'", value, name))]
    InvalidSize {
        name: String,
        value: String,
        source: ParseIntError,
    },
    #[snafu(display("Unknown encoding '{}' for file '{}'", value, name))]
    UnknownEncoding { name: String, value: String },
    #[snafu(display("Inconsistent VFS structure: {}", source))]
    StructureError { source: CannotAddChildError },
}
