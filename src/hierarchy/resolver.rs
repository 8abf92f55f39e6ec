//! Direction-aware interpretation of link values.

use std::collections::{HashMap, HashSet};

use crate::hierarchy::node_set::{Node, NodeSet};
use crate::types::Direction;

/// Resolves parents or children over a [`NodeSet`].
///
/// Pure lookups; multi-valued links keep their stored order.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    nodes: &'a NodeSet,
    direction: Direction,
}

impl<'a> LinkResolver<'a> {
    pub fn new(nodes: &'a NodeSet, direction: Direction) -> Self {
        Self { nodes, direction }
    }

    /// The parent id of `node`: its first link value, if any.
    ///
    /// Only meaningful under [`Direction::ChildToParent`]; returns `None`
    /// in the other direction.
    pub fn parent_of<'n>(&self, node: &'n Node) -> Option<&'n str> {
        match self.direction {
            Direction::ChildToParent => node.links.first().map(String::as_str),
            Direction::ParentToChild => None,
        }
    }

    /// The child ids of `node` in link order.
    ///
    /// Only meaningful under [`Direction::ParentToChild`]; empty otherwise.
    pub fn children_of<'n>(&self, node: &'n Node) -> &'n [String] {
        match self.direction {
            Direction::ParentToChild => &node.links,
            Direction::ChildToParent => &[],
        }
    }

    /// Group node indices by parent id, each group in natural order.
    ///
    /// The `None` group holds the roots (records without a link value).
    /// A record whose link value names no id belongs to no group and is
    /// never reached. Equivalent to re-scanning the whole set for every
    /// parent.
    pub fn children_by_parent(&self) -> HashMap<Option<&'a str>, Vec<usize>> {
        let nodes: &'a NodeSet = self.nodes;
        let mut groups: HashMap<Option<&'a str>, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            let parent = self.parent_of(node);
            if parent.is_none() && node.has_link {
                continue;
            }
            groups.entry(parent).or_default().push(idx);
        }
        groups
    }

    /// Node indices that no record lists as a child, in natural order.
    pub fn roots(&self) -> Vec<usize> {
        let referenced: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|n| self.children_of(n).iter().map(String::as_str))
            .collect();
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !referenced.contains(n.id.as_str()))
            .map(|(idx, _)| idx)
            .collect()
    }
}
