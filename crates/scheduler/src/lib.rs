pub mod least_loaded;

#[cfg(test)]
pub(crate) mod tests_common;

use flotilla_core::types::NodeName;

/// Snapshot of one configured node's state for a scheduling decision.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub name: NodeName,
    pub load: u32,
    pub capacity: u32,
}

impl NodeView {
    pub fn has_room(&self) -> bool {
        self.load < self.capacity
    }
}

/// Outcome of one placement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Run the task on this node.
    Node(NodeName),
    /// No configured node has spare capacity right now.
    Busy,
    /// Capacity exists, but every open node is excluded for this task.
    /// `tried` counts the task's own black-list, `total` the configured
    /// node set; `tried == total` means the task has failed everywhere it
    /// could ever run.
    AllBad { tried: usize, total: usize },
}

pub use least_loaded::select;
