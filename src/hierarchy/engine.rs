//! Hierarchy reconstruction and label generation.
//!
//! Two traversals over a [`NodeSet`]:
//!
//! - **Child-to-parent**: records without a link are roots; every other
//!   record hangs under the record its first link points to.
//! - **Parent-to-child**: roots are records nobody links to; children are
//!   taken from each record's link list in stored order.
//!
//! Both walk depth-first in pre-order using explicit stacks, so deep
//! hierarchies cannot exhaust the call stack. Labels are built by appending
//! the separator and the node's component to its parent's full label, which
//! is the same as joining the ancestor components root-first.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::hierarchy::node_set::NodeSet;
use crate::hierarchy::resolver::LinkResolver;
use crate::types::{Assignment, Direction, LabelMode};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Traversal and labeling options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOptions {
    pub direction: Direction,
    pub mode: LabelMode,
    pub separator: String,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            direction: Direction::ChildToParent,
            mode: LabelMode::Index,
            separator: ".".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// Pending child-to-parent visit: a node, its position among siblings, and
/// the accumulated label of its parent including the trailing separator.
struct PendingMatch {
    idx: usize,
    position: usize,
    prefix: Rc<str>,
}

/// Pending parent-to-child visit. `parent` indexes into the trail arena.
struct PendingChild {
    idx: usize,
    position: usize,
    parent: usize,
}

/// One labeled step of a parent-to-child path. Entries are never mutated
/// once pushed, so sibling branches share their common prefix safely.
struct TrailEntry {
    idx: usize,
    label: String,
    parent: Option<usize>,
}

// ---------------------------------------------------------------------------
// HierarchyEngine
// ---------------------------------------------------------------------------

/// Computes one [`Assignment`] per reachable record.
///
/// Unreachable records (a missing parent, cycle members) get nothing; the
/// engine never fails.
pub struct HierarchyEngine<'a> {
    nodes: &'a NodeSet,
    options: &'a LabelOptions,
}

impl<'a> HierarchyEngine<'a> {
    pub fn new(nodes: &'a NodeSet, options: &'a LabelOptions) -> Self {
        Self { nodes, options }
    }

    /// Run the traversal selected by `options.direction`.
    pub fn run(&self) -> Vec<Assignment> {
        let assignments = match self.options.direction {
            Direction::ChildToParent => self.label_child_to_parent(),
            Direction::ParentToChild => self.label_parent_to_child(),
        };
        tracing::debug!(
            direction = %self.options.direction,
            mode = %self.options.mode,
            records = self.nodes.len(),
            assignments = assignments.len(),
            "hierarchy traversal complete"
        );
        assignments
    }

    /// Child-to-parent descent.
    ///
    /// Siblings are the records sharing a parent, in natural order. Each
    /// record is labeled at most once.
    pub fn label_child_to_parent(&self) -> Vec<Assignment> {
        let resolver = LinkResolver::new(self.nodes, Direction::ChildToParent);
        let groups = resolver.children_by_parent();
        let mut labeled = vec![false; self.nodes.len()];
        let mut out = Vec::new();

        let Some(roots) = groups.get(&None) else {
            return out;
        };
        let empty: Rc<str> = Rc::from("");
        let mut stack: Vec<PendingMatch> = roots
            .iter()
            .enumerate()
            .rev()
            .map(|(position, &idx)| PendingMatch {
                idx,
                position,
                prefix: Rc::clone(&empty),
            })
            .collect();

        while let Some(PendingMatch {
            idx,
            position,
            prefix,
        }) = stack.pop()
        {
            if std::mem::replace(&mut labeled[idx], true) {
                continue;
            }
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            let item = self.options.mode.component(position, &node.label_source);
            let label = format!("{prefix}{item}");

            if let Some(children) = groups.get(&Some(node.id.as_str())) {
                let child_prefix: Rc<str> = Rc::from(format!("{label}{}", self.options.separator));
                stack.extend(children.iter().enumerate().rev().map(|(position, &idx)| {
                    PendingMatch {
                        idx,
                        position,
                        prefix: Rc::clone(&child_prefix),
                    }
                }));
            }
            out.push(Assignment::new(node.id.clone(), label));
        }
        out
    }

    /// Parent-to-child descent with root discovery.
    ///
    /// Roots are labeled by their position among all roots; children by
    /// their position in the parent's link list. Link ids missing from the
    /// node set are skipped, as is any child already on its own ancestor
    /// path.
    pub fn label_parent_to_child(&self) -> Vec<Assignment> {
        let resolver = LinkResolver::new(self.nodes, Direction::ParentToChild);
        let mut trail: Vec<TrailEntry> = Vec::new();
        let mut stack: Vec<PendingChild> = Vec::new();
        let mut out = Vec::new();

        for (root_position, root_idx) in resolver.roots().into_iter().enumerate() {
            let Some(root) = self.nodes.get(root_idx) else {
                continue;
            };
            let label = self.options.mode.component(root_position, &root.label_source);
            out.push(Assignment::new(root.id.clone(), label.clone()));
            trail.push(TrailEntry {
                idx: root_idx,
                label,
                parent: None,
            });
            self.push_children(&resolver, &mut stack, root_idx, trail.len() - 1);

            while let Some(PendingChild {
                idx,
                position,
                parent,
            }) = stack.pop()
            {
                if on_path(&trail, parent, idx) {
                    tracing::debug!(
                        id = %self.nodes.get(idx).map(|n| n.id.as_str()).unwrap_or_default(),
                        "skipping link back to an ancestor"
                    );
                    continue;
                }
                let Some(node) = self.nodes.get(idx) else {
                    continue;
                };
                let item = self.options.mode.component(position, &node.label_source);
                let label = format!("{}{}{item}", trail[parent].label, self.options.separator);
                out.push(Assignment::new(node.id.clone(), label.clone()));
                trail.push(TrailEntry {
                    idx,
                    label,
                    parent: Some(parent),
                });
                self.push_children(&resolver, &mut stack, idx, trail.len() - 1);
            }
        }
        out
    }

    /// Queue the children of `idx` so they pop in link order.
    fn push_children(
        &self,
        resolver: &LinkResolver<'_>,
        stack: &mut Vec<PendingChild>,
        idx: usize,
        trail_idx: usize,
    ) {
        let Some(node) = self.nodes.get(idx) else {
            return;
        };
        let children = resolver.children_of(node);
        let start = stack.len();
        for (position, child_id) in children.iter().enumerate() {
            match self.nodes.position(child_id) {
                Some(child_idx) => stack.push(PendingChild {
                    idx: child_idx,
                    position,
                    parent: trail_idx,
                }),
                None => tracing::debug!(parent = %node.id, child = %child_id, "linked record not in view"),
            }
        }
        stack[start..].reverse();
    }
}

/// Whether node `idx` already appears on the trail ending at `from`.
fn on_path(trail: &[TrailEntry], from: usize, idx: usize) -> bool {
    let mut cursor = Some(from);
    while let Some(i) = cursor {
        if trail[i].idx == idx {
            return true;
        }
        cursor = trail[i].parent;
    }
    false
}

/// Index assignments by record id. Later duplicates overwrite earlier ones.
pub fn labels_by_id(assignments: &[Assignment]) -> HashMap<&str, &str> {
    assignments
        .iter()
        .map(|a| (a.id.as_str(), a.label.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
