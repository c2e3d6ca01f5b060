//! Module layering for presentation.
//!
//! Builds a directed module graph (caller module -> callee module) with
//! petgraph and assigns every module to the deepest layer at which it is
//! reachable from a root. Positions are left to the presentation layer.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::callslot::CallSlotType;
use crate::graph::Graph;
use crate::id::ModuleId;

/// Groups module ids into layers, roots first.
///
/// Roots are modules without a connected callee slot. Depth is bounded by
/// the module count, so cycles terminate. Modules not reachable from any
/// root form one trailing layer. Empty layers are dropped and each layer
/// keeps the graph's module order.
pub fn layer_modules(graph: &Graph) -> Vec<Vec<ModuleId>> {
    let mut dag: DiGraph<ModuleId, ()> = DiGraph::new();
    let mut nodes: HashMap<ModuleId, NodeIndex> = HashMap::new();
    for module in graph.modules() {
        nodes.insert(module.id(), dag.add_node(module.id()));
    }

    for call in graph.calls() {
        let endpoints = call
            .callslot(CallSlotType::Caller)
            .zip(call.callslot(CallSlotType::Callee))
            .and_then(|(caller, callee)| {
                let from = graph.callslot_parent(caller)?.id();
                let to = graph.callslot_parent(callee)?.id();
                Some((*nodes.get(&from)?, *nodes.get(&to)?))
            });
        if let Some((from, to)) = endpoints {
            dag.add_edge(from, to, ());
        }
    }

    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    let mut frontier: Vec<NodeIndex> = dag
        .node_indices()
        .filter(|n| dag.neighbors_directed(*n, Direction::Incoming).next().is_none())
        .collect();
    for node in &frontier {
        depth.insert(*node, 0);
    }

    let max_depth = dag.node_count();
    let mut level = 0;
    while !frontier.is_empty() && level < max_depth {
        level += 1;
        let mut seen = HashSet::new();
        let mut next = Vec::new();
        for node in &frontier {
            for succ in dag.neighbors_directed(*node, Direction::Outgoing) {
                if seen.insert(succ) {
                    depth.insert(succ, level);
                    next.push(succ);
                }
            }
        }
        frontier = next;
    }

    let mut layers: Vec<Vec<ModuleId>> = vec![Vec::new(); max_depth + 1];
    let mut unreached = Vec::new();
    for module in graph.modules() {
        let Some(node) = nodes.get(&module.id()) else {
            continue;
        };
        match depth.get(node) {
            Some(d) => layers[*d].push(module.id()),
            None => unreached.push(module.id()),
        }
    }
    layers.push(unreached);
    layers.retain(|layer| !layer.is_empty());
    layers
}
