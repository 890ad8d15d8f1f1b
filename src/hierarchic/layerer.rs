//! Layer assignment strategies.

use super::cycles::{
    CycleRemoval, EdgeWeightProvider, remove_cycles_dfs, remove_cycles_weighted,
};
use super::graph::LayoutGraph;
use super::traversal::{CancellationToken, TraversalResult};
use crate::config::{LayeringStrategy, LayoutConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Layer membership by node index. Layers are contiguous from 0 and list
/// their nodes in the order they will be sequenced from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerNodeMap {
    pub layers: Vec<Vec<usize>>,
    pub layer_of: Vec<usize>,
    /// Edges whose target sits in an earlier layer than their source
    pub reversed_edges: Vec<usize>,
}

impl LayerNodeMap {
    /// Compacts arbitrary ranks into contiguous layers; nodes keep index order
    /// within a layer.
    pub fn from_ranks(graph: &LayoutGraph, ranks: &[usize]) -> Self {
        let mut distinct: Vec<usize> = ranks.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let compact: BTreeMap<usize, usize> = distinct
            .iter()
            .enumerate()
            .map(|(layer, &rank)| (rank, layer))
            .collect();

        let mut layers = vec![Vec::new(); distinct.len()];
        let mut layer_of = vec![0; ranks.len()];
        for (node, rank) in ranks.iter().enumerate() {
            let layer = compact[rank];
            layer_of[node] = layer;
            layers[layer].push(node);
        }

        let reversed_edges = graph
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.hidden && layer_of[e.target] < layer_of[e.source])
            .map(|(i, _)| i)
            .collect();

        Self {
            layers,
            layer_of,
            reversed_edges,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Id-based form for publishing between stages.
    pub fn to_assignment(&self, graph: &LayoutGraph) -> LayerAssignment {
        LayerAssignment {
            layered_graph: self
                .layers
                .iter()
                .enumerate()
                .map(|(i, nodes)| (i, nodes.iter().map(|&n| graph.node(n).id.clone()).collect()))
                .collect(),
            reversed_edges: self
                .reversed_edges
                .iter()
                .map(|&e| graph.edge(e).id.clone())
                .collect(),
            layer_count: self.layer_count(),
        }
    }
}

/// Layer membership by node id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAssignment {
    pub layered_graph: BTreeMap<usize, Vec<String>>,
    pub reversed_edges: Vec<String>,
    pub layer_count: usize,
}

impl LayerAssignment {
    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.layered_graph
            .iter()
            .find(|(_, nodes)| nodes.iter().any(|n| n == id))
            .map(|(&layer, _)| layer)
    }
}

/// Assigns every node of a graph to a layer.
pub trait Layerer {
    fn name(&self) -> &'static str;

    /// May set the `reversed` flag on graph edges.
    fn assign_layers(&self, graph: &mut LayoutGraph, cancel: &CancellationToken) -> LayerNodeMap;
}

/// Builds layers from the nodes' current positions: nodes whose padded
/// extents overlap on the layer axis share a layer.
pub struct FromSketchLayerer<'a> {
    config: &'a LayoutConfig,
}

impl<'a> FromSketchLayerer<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// `[min, max]` of a node on the layer axis.
    fn interval(&self, graph: &LayoutGraph, node: usize) -> (f64, f64) {
        let config = self.config;
        let n = graph.node(node);
        let (start, extent) = if config.layout_orientation.is_horizontal() {
            (n.position.x, n.width_or(config.min_node_size))
        } else {
            (n.position.y, n.height_or(config.min_node_size))
        };
        let size = (2.0 * config.node_halo_val + extent * config.node_scale_factor)
            .min(config.max_node_size)
            .max(config.min_node_size);
        let center = start + 0.5 * extent;
        (center - 0.5 * size, center + 0.5 * size)
    }
}

impl Layerer for FromSketchLayerer<'_> {
    fn name(&self) -> &'static str {
        "from-sketch"
    }

    fn assign_layers(&self, graph: &mut LayoutGraph, _cancel: &CancellationToken) -> LayerNodeMap {
        let intervals: Vec<(f64, f64)> = (0..graph.node_count())
            .map(|n| self.interval(graph, n))
            .collect();
        // Nodes without edges stay in layer 0 wherever they were drawn
        let mut sorted: Vec<usize> = (0..graph.node_count())
            .filter(|&n| !is_isolated(graph, n))
            .collect();
        sorted.sort_by(|&a, &b| intervals[a].0.total_cmp(&intervals[b].0).then(a.cmp(&b)));

        let mut ranks = vec![0; graph.node_count()];
        let mut current = 0;
        let mut boundary = f64::NEG_INFINITY;
        for (i, &node) in sorted.iter().enumerate() {
            let (min, max) = intervals[node];
            if i > 0 && min > boundary {
                current += 1;
                boundary = max;
            } else {
                boundary = boundary.max(max);
            }
            ranks[node] = current;
        }

        LayerNodeMap::from_ranks(graph, &ranks)
    }
}

fn is_isolated(graph: &LayoutGraph, node: usize) -> bool {
    graph.incident(node).all(|e| graph.edge(e).is_self_loop())
}

/// How the weighted layerer breaks cycles before ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleBreaking {
    /// Greedy weighted feedback arc set
    Weighted,
    /// Back edges of a depth-first search
    DepthFirst,
}

/// Longest-path ranking per connected component.
pub struct WeightedLayerer<'a> {
    weights: &'a dyn EdgeWeightProvider,
    cycles: CycleBreaking,
}

impl<'a> WeightedLayerer<'a> {
    pub fn new(weights: &'a dyn EdgeWeightProvider, cycles: CycleBreaking) -> Self {
        Self { weights, cycles }
    }

    /// Longest path from the component's sources over the edges `removal`
    /// keeps.
    fn rank_component(
        graph: &LayoutGraph,
        component: &[usize],
        removal: &CycleRemoval,
        ranks: &mut [usize],
    ) {
        let mut pending = vec![0usize; graph.node_count()];
        for &node in component {
            pending[node] = graph.incoming(node).filter(|&e| removal.keeps(e)).count();
        }

        let mut ready: VecDeque<usize> =
            component.iter().copied().filter(|&n| pending[n] == 0).collect();
        let mut placed = 0;
        while let Some(node) = ready.pop_front() {
            placed += 1;
            for e in graph.outgoing(node).filter(|&e| removal.keeps(e)) {
                let next = graph.edge(e).target;
                ranks[next] = ranks[next].max(ranks[node] + 1);
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if placed < component.len() {
            tracing::warn!(
                unranked = component.len() - placed,
                "cycle removal left a cycle, ranking the rest from placed predecessors"
            );
        }
    }
}

impl Layerer for WeightedLayerer<'_> {
    fn name(&self) -> &'static str {
        match self.cycles {
            CycleBreaking::Weighted => "weighted",
            CycleBreaking::DepthFirst => "topological",
        }
    }

    fn assign_layers(&self, graph: &mut LayoutGraph, cancel: &CancellationToken) -> LayerNodeMap {
        let mut ranks = vec![0; graph.node_count()];
        let mut removal = CycleRemoval {
            reversed: vec![false; graph.edge_count()],
            hidden: vec![false; graph.edge_count()],
        };

        for component in graph.components() {
            if cancel.is_cancelled() {
                break;
            }
            let local = match self.cycles {
                CycleBreaking::Weighted => remove_cycles_weighted(graph, &component, self.weights),
                CycleBreaking::DepthFirst => remove_cycles_dfs(graph, &component),
            };
            Self::rank_component(graph, &component, &local, &mut ranks);
            removal.absorb(&local);
        }

        for (e, &reversed) in removal.reversed.iter().enumerate() {
            graph.set_reversed(e, reversed);
        }
        tracing::debug!(
            layerer = self.name(),
            reversed = removal.reversed_count(),
            "cycles removed"
        );

        LayerNodeMap::from_ranks(graph, &ranks)
    }
}

/// Layers from traversal depths, compacted to contiguous indices.
pub struct TraversalLayerer<'a> {
    traversal: &'a TraversalResult,
}

impl<'a> TraversalLayerer<'a> {
    pub fn new(traversal: &'a TraversalResult) -> Self {
        Self { traversal }
    }
}

impl Layerer for TraversalLayerer<'_> {
    fn name(&self) -> &'static str {
        "traversal"
    }

    fn assign_layers(&self, graph: &mut LayoutGraph, _cancel: &CancellationToken) -> LayerNodeMap {
        let ranks: Vec<usize> = graph
            .nodes()
            .iter()
            .map(|n| self.traversal.depth_of(&n.id))
            .collect();
        LayerNodeMap::from_ranks(graph, &ranks)
    }
}

/// Picks the layerer for a configured strategy.
pub fn layerer_for<'a>(
    config: &'a LayoutConfig,
    traversal: &'a TraversalResult,
    weights: &'a dyn EdgeWeightProvider,
) -> Box<dyn Layerer + 'a> {
    match config.layering_strategy {
        LayeringStrategy::Default => Box::new(FromSketchLayerer::new(config)),
        LayeringStrategy::Bfs => Box::new(TraversalLayerer::new(traversal)),
        LayeringStrategy::Topological => {
            Box::new(WeightedLayerer::new(weights, CycleBreaking::DepthFirst))
        }
        LayeringStrategy::Weighted => Box::new(WeightedLayerer::new(weights, CycleBreaking::Weighted)),
    }
}
