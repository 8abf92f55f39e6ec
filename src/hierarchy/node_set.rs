//! Immutable in-memory view over the fetched records.

use std::collections::HashMap;

use crate::types::{CellValue, RecordId, StoredRecord};

/// One record reduced to what the traversal needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: RecordId,
    /// Linked ids in stored order.
    pub links: Vec<RecordId>,
    /// Whether the link cell held any value, even one naming no record
    /// (`[null]`, a blob). Only records without one are child-to-parent roots.
    pub has_link: bool,
    pub label_source: CellValue,
}

impl Node {
    pub fn new(id: impl Into<RecordId>, links: Vec<RecordId>, label_source: CellValue) -> Self {
        let has_link = !links.is_empty();
        Self {
            id: id.into(),
            links,
            has_link,
            label_source,
        }
    }

    /// Mark the link cell as non-empty even though it yielded no ids.
    pub fn with_link_value(mut self, has_link: bool) -> Self {
        self.has_link = has_link || !self.links.is_empty();
        self
    }
}

/// Records in the view's order, with lookup by id.
///
/// Built once and never mutated. Node indices are positions in fetch order.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: Vec<Node>,
    index: HashMap<RecordId, usize>,
}

impl NodeSet {
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            // First occurrence wins, matching a lookup that scans in order.
            index.entry(node.id.clone()).or_insert(i);
        }
        Self { nodes, index }
    }

    /// Build from stored records, reading links from `link_field` and the
    /// label source from `label_field` (NULL when absent).
    pub fn from_records(
        records: &[StoredRecord],
        link_field: &str,
        label_field: Option<&str>,
    ) -> Self {
        let nodes = records
            .iter()
            .map(|rec| {
                let label_source = label_field
                    .map(|f| rec.cell(f).clone())
                    .unwrap_or_default();
                let link = rec.cell(link_field);
                Node::new(rec.id.clone(), link.links(), label_source)
                    .with_link_value(!link.is_empty())
            })
            .collect();
        Self::new(nodes)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Nodes in natural (fetch) order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}
