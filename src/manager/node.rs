//! Namespace tree mirroring dot-delimited logger names
//!
//! Nodes live in an arena and refer to each other by index. A node exists
//! for every prefix of every name that was looked up; only some of them have
//! a logger bound.

use crate::core::logger::Logger;
use std::collections::HashMap;
use std::sync::Arc;

pub type NodeId = usize;

#[derive(Debug)]
struct Node {
    segment: String,
    logger: Option<Arc<Logger>>,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
}

impl Node {
    fn new(segment: &str, parent: Option<NodeId>) -> Self {
        Self {
            segment: segment.to_string(),
            logger: None,
            parent,
            children: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("", None)],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Terminal node of `name`, creating intermediate nodes on demand.
    /// The empty name is the root.
    pub fn find_node(&mut self, name: &str) -> NodeId {
        if name.is_empty() {
            return Self::ROOT;
        }
        let mut current = Self::ROOT;
        for segment in name.split('.') {
            current = match self.nodes[current].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::new(segment, Some(current)));
                    self.nodes[current]
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        current
    }

    /// Like [`NodeTree::find_node`] but never creates nodes
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        if name.is_empty() {
            return Some(Self::ROOT);
        }
        name.split('.').try_fold(Self::ROOT, |current, segment| {
            self.nodes.get(current)?.children.get(segment).copied()
        })
    }

    pub fn segment(&self, id: NodeId) -> &str {
        &self.nodes[id].segment
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.values().copied()
    }

    pub fn logger(&self, id: NodeId) -> Option<&Arc<Logger>> {
        self.nodes[id].logger.as_ref()
    }

    /// Dot-joined path from the root
    pub fn full_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node != Self::ROOT {
                segments.push(self.nodes[node].segment.as_str());
            }
            current = self.nodes[node].parent;
        }
        segments.reverse();
        segments.join(".")
    }

    pub fn bind(&mut self, id: NodeId, logger: Arc<Logger>) {
        self.nodes[id].logger = Some(logger);
    }

    /// Nearest logger bound strictly above `id`; `None` at the root
    pub fn find_parent_logger(&self, id: NodeId) -> Option<Arc<Logger>> {
        let mut current = self.nodes[id].parent;
        while let Some(node) = current {
            if let Some(logger) = &self.nodes[node].logger {
                return Some(Arc::clone(logger));
            }
            current = self.nodes[node].parent;
        }
        None
    }

    /// Make `parent` the parent of every logger below `id` that has no
    /// closer bound ancestor.
    pub fn propagate_parent(&self, id: NodeId, parent: &Arc<Logger>) {
        let mut pending: Vec<NodeId> = self.children(id).collect();
        while let Some(node) = pending.pop() {
            match &self.nodes[node].logger {
                Some(logger) => logger.set_parent(Some(Arc::clone(parent))),
                None => pending.extend(self.children(node)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_node_creates_every_prefix() {
        let mut tree = NodeTree::new();
        let leaf = tree.find_node("a.b.c");

        assert_eq!(tree.len(), 4);
        assert!(tree.lookup("a").is_some());
        assert!(tree.lookup("a.b").is_some());
        assert_eq!(tree.lookup("a.b.c"), Some(leaf));
        assert_eq!(tree.full_name(leaf), "a.b.c");
        assert_eq!(tree.segment(leaf), "c");
        assert_eq!(tree.find_node(""), NodeTree::ROOT);
        assert_eq!(tree.find_node("a.b.c"), leaf);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_find_parent_logger_none_in_bare_tree() {
        let mut tree = NodeTree::new();
        let leaf = tree.find_node("a.b.c");
        assert!(tree.find_parent_logger(leaf).is_none());
        assert!(tree.find_parent_logger(NodeTree::ROOT).is_none());
    }

    #[test]
    fn test_find_parent_logger_skips_unbound_nodes() {
        let mut tree = NodeTree::new();
        let a = tree.find_node("a");
        let a_logger = Arc::new(Logger::new("a"));
        tree.bind(a, Arc::clone(&a_logger));

        let leaf = tree.find_node("a.b.c");
        let parent = tree.find_parent_logger(leaf).unwrap();
        assert_eq!(parent.name(), "a");
    }

    #[test]
    fn test_propagate_parent_stops_at_bound_nodes() {
        let mut tree = NodeTree::new();
        let root_logger = Arc::new(Logger::new(""));
        tree.bind(NodeTree::ROOT, Arc::clone(&root_logger));

        let abc = tree.find_node("a.b.c");
        let abc_logger = Arc::new(Logger::new("a.b.c"));
        abc_logger.set_parent(Some(Arc::clone(&root_logger)));
        tree.bind(abc, Arc::clone(&abc_logger));

        let abcd = tree.find_node("a.b.c.d");
        let abcd_logger = Arc::new(Logger::new("a.b.c.d"));
        abcd_logger.set_parent(Some(Arc::clone(&abc_logger)));
        tree.bind(abcd, Arc::clone(&abcd_logger));

        // Now bind "a" and push it down.
        let a = tree.find_node("a");
        let a_logger = Arc::new(Logger::new("a"));
        tree.bind(a, Arc::clone(&a_logger));
        tree.propagate_parent(a, &a_logger);

        assert_eq!(abc_logger.parent().unwrap().name(), "a");
        assert_eq!(abcd_logger.parent().unwrap().name(), "a.b.c");
    }
}
