// src/graph/validate.rs

//! Optional acyclicity check run before a pass.

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskGraphError};
use crate::graph::pool::NodePool;

/// Fail with [`TaskGraphError::DagCycle`] if the in-use nodes contain a
/// cycle.
///
/// Edge direction: parent -> child.
pub(crate) fn ensure_acyclic(pool: &NodePool) -> Result<()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for index in pool.in_use_indices() {
        graph.add_node(index);
        for &child in &pool.slot(index).children {
            graph.add_edge(index, child, ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let index = cycle.node_id();
            let node = pool.slot(index);
            Err(TaskGraphError::DagCycle(format!(
                "cycle detected in task graph involving node '{}' ({})",
                node.display_name(index),
                pool.id_of(index)
            )))
        }
    }
}
