//! Property-based tests for hierlabel using proptest.
//!
//! Random forests are generated as parent vectors: record `i` either is a
//! root or points at some record `j < i`, which guarantees acyclicity.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use hierlabel::hierarchy::{HierarchyEngine, LabelOptions, Node, NodeSet};
use hierlabel::store::{RecordSource, RecordStore, TableSchema, MAX_UPDATE_BATCH};
use hierlabel::types::{Assignment, CellValue, Direction, LabelMode, RecordUpdate, StoredRecord};
use hierlabel::writer::BatchWriter;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// `parents[i]` is `None` for a root or `Some(j)` with `j < i`.
fn arb_forest(max: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(any::<(bool, prop::sample::Index)>(), 1..max).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, (root, idx))| if root || i == 0 { None } else { Some(idx.index(i)) })
            .collect()
    })
}

fn id(i: usize) -> String {
    format!("r{i}")
}

fn name(i: usize) -> String {
    format!("N{i}")
}

/// Child-to-parent node set: each record links to its parent.
fn c2p_nodes(parents: &[Option<usize>]) -> NodeSet {
    NodeSet::new(
        parents
            .iter()
            .enumerate()
            .map(|(i, p)| Node::new(id(i), p.map(id).into_iter().collect(), CellValue::from(name(i))))
            .collect(),
    )
}

/// Parent-to-child node set: each record lists its children in index order.
fn p2c_nodes(parents: &[Option<usize>]) -> NodeSet {
    let mut children: Vec<Vec<String>> = vec![Vec::new(); parents.len()];
    for (i, p) in parents.iter().enumerate() {
        if let Some(p) = p {
            children[*p].push(id(i));
        }
    }
    NodeSet::new(
        children
            .into_iter()
            .enumerate()
            .map(|(i, kids)| Node::new(id(i), kids, CellValue::from(name(i))))
            .collect(),
    )
}

fn options(direction: Direction, mode: LabelMode, separator: &str) -> LabelOptions {
    LabelOptions {
        direction,
        mode,
        separator: separator.to_string(),
    }
}

fn label_map(assignments: &[Assignment]) -> HashMap<String, String> {
    assignments
        .iter()
        .map(|a| (a.id.clone(), a.label.clone()))
        .collect()
}

fn ancestors(parents: &[Option<usize>], mut i: usize) -> Vec<usize> {
    let mut chain = vec![i];
    while let Some(p) = parents[i] {
        chain.push(p);
        i = p;
    }
    chain.reverse();
    chain
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Every record of an acyclic forest is labeled exactly once.
    #[test]
    fn each_record_labeled_once(parents in arb_forest(60)) {
        for direction in [Direction::ChildToParent, Direction::ParentToChild] {
            let nodes = match direction {
                Direction::ChildToParent => c2p_nodes(&parents),
                Direction::ParentToChild => p2c_nodes(&parents),
            };
            let opts = options(direction, LabelMode::Index, ".");
            let assignments = HierarchyEngine::new(&nodes, &opts).run();
            prop_assert_eq!(assignments.len(), parents.len());
            let unique: HashSet<&str> = assignments.iter().map(|a| a.id.as_str()).collect();
            prop_assert_eq!(unique.len(), parents.len());
        }
    }

    /// Path labels are the separator-joined names from the root down.
    #[test]
    fn path_label_is_joined_ancestors(parents in arb_forest(40), sep in "[-/>. ]{1,3}") {
        let nodes = c2p_nodes(&parents);
        let opts = options(Direction::ChildToParent, LabelMode::Path, &sep);
        let labels = label_map(&HierarchyEngine::new(&nodes, &opts).run());
        for i in 0..parents.len() {
            let joined: Vec<String> = ancestors(&parents, i).into_iter().map(name).collect();
            prop_assert_eq!(&labels[&id(i)], &joined.join(&sep));
        }
    }

    /// Siblings are numbered 1..N in record order.
    #[test]
    fn sibling_indices_are_dense(parents in arb_forest(60)) {
        let nodes = c2p_nodes(&parents);
        let opts = options(Direction::ChildToParent, LabelMode::Index, ".");
        let labels = label_map(&HierarchyEngine::new(&nodes, &opts).run());

        let mut groups: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
        for (i, p) in parents.iter().enumerate() {
            groups.entry(*p).or_default().push(i);
        }
        for members in groups.values() {
            for (pos, i) in members.iter().enumerate() {
                let last = labels[&id(*i)].rsplit('.').next().unwrap_or_default().to_string();
                prop_assert_eq!(last, (pos + 1).to_string());
            }
        }
    }

    /// Both directions produce the same labels for the same forest.
    #[test]
    fn directions_agree(parents in arb_forest(50)) {
        let opts_c = options(Direction::ChildToParent, LabelMode::Index, ".");
        let opts_p = options(Direction::ParentToChild, LabelMode::Index, ".");
        let c2p = c2p_nodes(&parents);
        let p2c = p2c_nodes(&parents);
        let c = label_map(&HierarchyEngine::new(&c2p, &opts_c).run());
        let p = label_map(&HierarchyEngine::new(&p2c, &opts_p).run());
        prop_assert_eq!(c, p);
    }

    /// Unchanged input gives identical output.
    #[test]
    fn traversal_is_deterministic(parents in arb_forest(50)) {
        let nodes = c2p_nodes(&parents);
        let opts = options(Direction::ChildToParent, LabelMode::Path, "/");
        let first = HierarchyEngine::new(&nodes, &opts).run();
        let second = HierarchyEngine::new(&nodes, &opts).run();
        prop_assert_eq!(first, second);
    }

    /// N updates take ceil(N / 50) store calls, each within the limit, and
    /// every record is sent exactly once.
    #[test]
    fn batch_writer_covers_every_update_once(n in 0usize..400) {
        let store = CountingStore::default();
        let assignments: Vec<Assignment> =
            (0..n).map(|i| Assignment::new(id(i), i.to_string())).collect();
        let summary = BatchWriter::new(&store, "tasks")
            .write_assignments(assignments, "outline", |_| {})
            .unwrap();
        let calls = store.calls.borrow();
        prop_assert_eq!(calls.len(), n.div_ceil(MAX_UPDATE_BATCH));
        prop_assert_eq!(summary.records, n);
        prop_assert!(calls.iter().all(|c| c.len() <= MAX_UPDATE_BATCH));
        let sent: HashSet<&str> = calls.iter().flatten().map(String::as_str).collect();
        prop_assert_eq!(sent.len(), n);
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CountingStore {
    calls: RefCell<Vec<Vec<String>>>,
}

impl RecordStore for CountingStore {
    fn describe_table(&self, _table: &str) -> hierlabel::error::Result<Option<TableSchema>> {
        Ok(None)
    }

    fn fetch_records(&self, _source: &RecordSource<'_>, _fields: &[&str]) -> hierlabel::error::Result<Vec<StoredRecord>> {
        Ok(Vec::new())
    }

    fn update_records(&self, _table: &str, updates: &[RecordUpdate]) -> hierlabel::error::Result<()> {
        self.calls
            .borrow_mut()
            .push(updates.iter().map(|u| u.id.clone()).collect());
        Ok(())
    }
}
