use std::collections::BTreeSet;

use flotilla_core::types::NodeName;

use crate::NodeView;

pub fn make_views(nodes: &[(&str, u32, u32)]) -> Vec<NodeView> {
    nodes
        .iter()
        .map(|(name, load, capacity)| NodeView {
            name: name.to_string(),
            load: *load,
            capacity: *capacity,
        })
        .collect()
}

pub fn n(name: &str) -> NodeName {
    name.to_string()
}

pub fn no_blacklist() -> BTreeSet<NodeName> {
    BTreeSet::new()
}

pub fn blacklist_of(names: &[&str]) -> BTreeSet<NodeName> {
    names.iter().map(|n| n.to_string()).collect()
}
