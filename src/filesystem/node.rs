use std::collections::BTreeMap;
use std::time::SystemTime;

use derive_more::Display;

use crate::ext::SystemTimeExt;

/// Size reported for every directory in detailed listings
pub const DIRECTORY_SIZE: u64 = 4096;

pub const DEFAULT_FILE_PERMISSIONS: &str = "rw-r--r--";
pub const DEFAULT_DIRECTORY_PERMISSIONS: &str = "rwxr-xr-x";
pub const DEFAULT_OWNER: &str = "user";
pub const DEFAULT_GROUP: &str = "user";

/// Whether `name` can be reached as a single path component
pub fn is_path_component(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && name != "." && name != ".."
}

/// Index of a node inside its [`Arena`](super::arena::Arena).
///
/// Ids are only meaningful for the arena that handed them out. A full reload
/// replaces the arena, so ids taken before a load must not be reused after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Encoding {
    #[default]
    #[display("text")]
    Text,
    #[display("base64")]
    Base64,
}

impl Encoding {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Encoding::Text),
            "base64" => Some(Encoding::Base64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File {
        content: String,
        encoding: Encoding,
    },
    Directory {
        children: BTreeMap<String, NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub size: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
    pub(super) parent: Option<NodeId>,
    pub metadata: Metadata,
}

impl Node {
    /// Creates a detached directory with default metadata
    pub fn directory(name: impl Into<String>, now: SystemTime) -> Self {
        Node {
            name: name.into(),
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
            parent: None,
            metadata: Metadata {
                permissions: DEFAULT_DIRECTORY_PERMISSIONS.to_string(),
                owner: DEFAULT_OWNER.to_string(),
                group: DEFAULT_GROUP.to_string(),
                size: DIRECTORY_SIZE,
                created: now,
                modified: now,
            },
        }
    }

    /// Creates a detached text file whose size is the content length
    pub fn file(name: impl Into<String>, content: impl Into<String>, now: SystemTime) -> Self {
        let content = content.into();
        Node {
            name: name.into(),
            metadata: Metadata {
                permissions: DEFAULT_FILE_PERMISSIONS.to_string(),
                owner: DEFAULT_OWNER.to_string(),
                group: DEFAULT_GROUP.to_string(),
                size: content.len() as u64,
                created: now,
                modified: now,
            },
            kind: NodeKind::File {
                content,
                encoding: Encoding::Text,
            },
            parent: None,
        }
    }

    pub fn with_encoding(mut self, new_encoding: Encoding) -> Self {
        if let NodeKind::File { encoding, .. } = &mut self.kind {
            *encoding = new_encoding;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoding(&self) -> Option<Encoding> {
        match &self.kind {
            NodeKind::File { encoding, .. } => Some(*encoding),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub(super) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Renders one `ls -l` style line for this node, shown under `name`.
    ///
    /// The name is passed in so the synthesized `..` entry can reuse the
    /// parent's metadata.
    pub fn detailed_listing(&self, name: &str) -> String {
        let marker = if self.is_directory() { 'd' } else { '-' };
        format!(
            "{marker}{} 1 {:<8} {:<8} {:>8} {} {name}",
            self.metadata.permissions,
            self.metadata.owner,
            self.metadata.group,
            self.metadata.size,
            self.metadata.modified.to_listing_time(),
        )
    }
}
