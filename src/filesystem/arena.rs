use std::time::{Duration, SystemTime};

use snafu::{Snafu, ensure};

use super::node::{Node, NodeId};

/// Hands out strictly increasing timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    last: SystemTime,
}

impl Clock {
    pub fn new() -> Self {
        Clock {
            last: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn now(&mut self) -> SystemTime {
        let now = SystemTime::now();
        self.last = if now > self.last {
            now
        } else {
            self.last + Duration::from_nanos(1)
        };
        self.last
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat storage for one filesystem tree.
///
/// Nodes own their position in `nodes`; directories refer to children by
/// [`NodeId`] and every node points back to its parent by id, so the only
/// owner of any node is the arena itself.
#[derive(Debug, Clone)]
pub struct Arena {
    nodes: Vec<Node>,
    clock: Clock,
}

impl Arena {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Starts an empty tree whose timestamps continue from `clock`
    pub fn with_clock(mut clock: Clock) -> Self {
        let root = Node::directory("", clock.now());
        Arena {
            nodes: vec![root],
            clock,
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn now(&mut self) -> SystemTime {
        self.clock.now()
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Stores a detached node and returns its id. The node is unreachable
    /// until linked with [`Arena::add_child`].
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Links `child` under `parent`, replacing any sibling with the same name.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), CannotAddChildError> {
        ensure!(
            self.get(parent).is_directory(),
            ParentIsFileSnafu {
                parent: self.full_path(parent),
                child: self.get(child).name().to_string(),
            }
        );
        ensure!(
            child != Self::ROOT && self.get(child).parent().is_none(),
            ChildAttachedSnafu {
                child: self.full_path(child),
            }
        );

        let name = self.get(child).name().to_string();
        let now = self.clock.now();
        let parent_node = self.get_mut(parent);
        if let Some(children) = parent_node.children_mut() {
            children.insert(name, child);
        }
        parent_node.metadata.modified = now;
        self.get_mut(child).parent = Some(parent);
        Ok(())
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent).children()?.get(name).copied()
    }

    pub fn full_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id);
            if node.parent().is_some() {
                names.push(node.name());
            }
            current = node.parent();
        }

        if names.is_empty() {
            return "/".to_string();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Ids of every node reachable from root, root included, depth first
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut seen = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            seen.push(id);
            if let Some(children) = self.get(id).children() {
                stack.extend(children.values().rev().copied());
            }
        }
        seen
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Snafu)]
pub enum CannotAddChildError {
    #[snafu(display("cannot add '{}' to non-directory '{}'", child, parent))]
    ParentIsFile { parent: String, child: String },
    #[snafu(display("'{}' is already attached to the tree", child))]
    ChildAttached { child: String },
}
