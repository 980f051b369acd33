//! Graph cleanup passes

use crate::graph::{Graph, NodeId, NodeKind};

/// Remove phis whose inputs are all the same value (ignoring the phi itself).
///
/// Uses of a removed phi are rewritten to that value. Runs to a fixpoint,
/// since removing one phi can make another redundant. Returns the number of
/// phis removed.
pub fn eliminate_redundant_phis(graph: &mut Graph) -> usize {
    let mut removed = 0;
    loop {
        let mut changed = false;
        for block in graph.block_ids().collect::<Vec<_>>() {
            let phis: Vec<NodeId> = graph
                .block(block)
                .nodes
                .iter()
                .copied()
                .take_while(|&n| graph.node(n).kind.is_phi())
                .collect();
            for phi in phis {
                if let Some(value) = unique_input(graph, phi) {
                    graph.replace_all_uses(phi, value);
                    graph.unschedule(phi);
                    removed += 1;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    if removed > 0 {
        tracing::trace!(target: "wasmgraph::passes", removed, "redundant phis eliminated");
    }
    removed
}

/// The single non-self input of `phi`, if there is exactly one distinct one
fn unique_input(graph: &Graph, phi: NodeId) -> Option<NodeId> {
    let NodeKind::Phi { inputs } = &graph.node(phi).kind else {
        return None;
    };
    let mut unique = None;
    for &input in inputs {
        if input == phi || Some(input) == unique {
            continue;
        }
        if unique.is_some() {
            return None;
        }
        unique = Some(input);
    }
    unique
}
