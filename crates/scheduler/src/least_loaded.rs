use std::collections::BTreeSet;

use tracing::debug;

use flotilla_core::types::NodeName;

use crate::{NodeView, Selection};

/// Pick a node for one task.
///
/// The preferred node wins outright when it is configured, has spare
/// capacity and is not excluded (the data-locality fast path). Otherwise
/// the least-loaded open node outside both black-lists is chosen.
///
/// `nodes` must be sorted by name (the registry hands it over that way);
/// the least-loaded scan keeps the first minimum it sees, which makes the
/// equal-load tie-break the node name order. Reproducible placement
/// depends on this.
///
/// Read-only over the snapshot; safe to call from the master's serialized
/// region.
pub fn select(
    preferred: Option<&str>,
    task_blacklist: &[NodeName],
    global_blacklist: &BTreeSet<NodeName>,
    nodes: &[NodeView],
) -> Selection {
    if let Some(pref) = preferred {
        if let Some(view) = nodes.iter().find(|v| v.name == pref) {
            if view.has_room()
                && !task_blacklist.iter().any(|n| n == pref)
                && !global_blacklist.contains(pref)
            {
                debug!(
                    "selected preferred node {} (load {}/{})",
                    view.name, view.load, view.capacity
                );
                return Selection::Node(view.name.clone());
            }
        }
    }

    let mut open = 0usize;
    let mut best: Option<&NodeView> = None;
    for view in nodes {
        if !view.has_room() {
            continue;
        }
        open += 1;
        if task_blacklist.iter().any(|n| *n == view.name)
            || global_blacklist.contains(&view.name)
        {
            continue;
        }
        match best {
            // strict < keeps the earlier name on equal load
            Some(b) if view.load >= b.load => {}
            _ => best = Some(view),
        }
    }

    match best {
        Some(view) => {
            debug!(
                "selected least-loaded node {} (load {}/{})",
                view.name, view.load, view.capacity
            );
            Selection::Node(view.name.clone())
        }
        None if open == 0 => Selection::Busy,
        None => Selection::AllBad {
            tried: task_blacklist.len(),
            total: nodes.len(),
        },
    }
}
