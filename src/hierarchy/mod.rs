//! Hierarchy layer: node set, link resolution and label generation.

pub mod engine;
pub mod node_set;
pub mod resolver;

pub use engine::{HierarchyEngine, LabelOptions};
pub use node_set::{Node, NodeSet};
pub use resolver::LinkResolver;
