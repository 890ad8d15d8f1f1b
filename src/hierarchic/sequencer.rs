//! Crossing minimization by alternating layer sweeps.
//!
//! Each sweep re-sorts every layer by a weight derived from the positions of
//! its neighbors in the layers already swept. A sweep is only kept when the
//! crossing count between adjacent layers does not grow.

use super::graph::LayoutGraph;
use super::traversal::CancellationToken;
use crate::config::{SequencerConfig, WeightHeuristic};
use crate::random::RandomUtils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `layer → node index → weight` from the last sweep that touched the layer
pub type LayerNodeWeights = Vec<BTreeMap<usize, f64>>;

/// Sweep direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Rank layers 1.. by their predecessors
    Upward,
    /// Rank layers ..n-1 by their successors
    Downward,
}

/// Final order per layer, by node id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAssignment {
    pub layers: Vec<Vec<String>>,
    /// Crossing estimate of the start order and after every accepted sweep
    pub crossing_history: Vec<usize>,
}

impl SequenceAssignment {
    /// `(layer, position)` of a node.
    pub fn order_of(&self, id: &str) -> Option<(usize, usize)> {
        self.layers.iter().enumerate().find_map(|(layer, nodes)| {
            nodes.iter().position(|n| n == id).map(|pos| (layer, pos))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequencingResult {
    pub layers: Vec<Vec<usize>>,
    pub crossings: usize,
    pub crossing_history: Vec<usize>,
    pub sweeps: usize,
}

impl SequencingResult {
    pub fn to_assignment(&self, graph: &LayoutGraph) -> SequenceAssignment {
        SequenceAssignment {
            layers: self
                .layers
                .iter()
                .map(|layer| layer.iter().map(|&n| graph.node(n).id.clone()).collect())
                .collect(),
            crossing_history: self.crossing_history.clone(),
        }
    }
}

/// Mean of the neighbor values.
pub fn barycenter(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of the neighbor values. For an even count the two middle values are
/// blended, each weighted by the spread of the opposite half.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        return Some(sorted[mid]);
    }
    let left = sorted[mid - 1] - sorted[0];
    let right = sorted[n - 1] - sorted[mid];
    if left + right == 0.0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some((sorted[mid - 1] * right + sorted[mid] * left) / (left + right))
    }
}

/// Number of inversions in `values`, by merge sort.
fn count_inversions(values: &mut [usize]) -> usize {
    let n = values.len();
    if n < 2 {
        return 0;
    }
    let (left, right) = values.split_at_mut(n / 2);
    let mut count = count_inversions(left) + count_inversions(right);

    let mut merged = Vec::with_capacity(n);
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if left[i] <= right[j] {
            merged.push(left[i]);
            i += 1;
        } else {
            merged.push(right[j]);
            count += left.len() - i;
            j += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    values.copy_from_slice(&merged);
    count
}

/// Layers plus each node's position within its layer
#[derive(Debug, Clone)]
struct Arrangement {
    layers: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Arrangement {
    fn new(layers: Vec<Vec<usize>>, node_count: usize) -> Self {
        let mut arrangement = Self {
            layers,
            order: vec![0; node_count],
        };
        for layer in 0..arrangement.layers.len() {
            arrangement.reindex(layer);
        }
        arrangement
    }

    fn reindex(&mut self, layer: usize) {
        for (pos, &node) in self.layers[layer].iter().enumerate() {
            self.order[node] = pos;
        }
    }
}

struct Run {
    arrangement: Arrangement,
    crossings: usize,
    history: Vec<usize>,
    sweeps: usize,
    node_weights: LayerNodeWeights,
    /// Weight of each edge from the last sweep that visited it
    edge_weights: Vec<Option<f64>>,
}

pub struct Sequencer<'a> {
    graph: &'a LayoutGraph,
    config: &'a SequencerConfig,
    heuristic: WeightHeuristic,
    cancel: &'a CancellationToken,
    layer_of: Vec<usize>,
    /// Neighbors in earlier layers, with the connecting edge
    upper: Vec<Vec<(usize, usize)>>,
    /// Neighbors in later layers, with the connecting edge
    lower: Vec<Vec<(usize, usize)>>,
    out_degree: Vec<usize>,
    in_degree: Vec<usize>,
}

impl<'a> Sequencer<'a> {
    /// `layer_of` gives each node's layer. Edges within one layer and hidden
    /// edges take no part in ordering.
    pub fn new(
        graph: &'a LayoutGraph,
        layer_of: &[usize],
        config: &'a SequencerConfig,
        heuristic: WeightHeuristic,
        cancel: &'a CancellationToken,
    ) -> Self {
        let n = graph.node_count();
        let mut upper = vec![Vec::new(); n];
        let mut lower = vec![Vec::new(); n];
        for (e, edge) in graph.visible_edges() {
            let (s, t) = (edge.source, edge.target);
            match layer_of[s].cmp(&layer_of[t]) {
                std::cmp::Ordering::Less => {
                    lower[s].push((t, e));
                    upper[t].push((s, e));
                }
                std::cmp::Ordering::Greater => {
                    lower[t].push((s, e));
                    upper[s].push((t, e));
                }
                std::cmp::Ordering::Equal => {}
            }
        }

        Self {
            graph,
            config,
            heuristic,
            cancel,
            layer_of: layer_of.to_vec(),
            upper,
            lower,
            out_degree: (0..n).map(|v| graph.out_degree(v)).collect(),
            in_degree: (0..n).map(|v| graph.in_degree(v)).collect(),
        }
    }

    fn neighbors(&self, node: usize, direction: SweepDirection) -> &[(usize, usize)] {
        match direction {
            SweepDirection::Upward => &self.upper[node],
            SweepDirection::Downward => &self.lower[node],
        }
    }

    /// Neighbors exactly one layer away in `direction`, with the connecting
    /// edge.
    fn adjacent_edges(
        &self,
        node: usize,
        direction: SweepDirection,
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        let layer = self.layer_of[node];
        self.neighbors(node, direction)
            .iter()
            .copied()
            .filter(move |&(u, _)| self.layer_of[u].abs_diff(layer) == 1)
    }

    fn adjacent(
        &self,
        node: usize,
        direction: SweepDirection,
    ) -> impl Iterator<Item = usize> + '_ {
        self.adjacent_edges(node, direction).map(|(u, _)| u)
    }

    /// Priority of `edge` as seen from `node`: its role, the node's fan on that
    /// side, and how far apart the endpoints currently sit.
    pub fn edge_priority(&self, edge: usize, node: usize, order: &[usize]) -> f64 {
        let cfg = self.config;
        let e = self.graph.edge(edge);
        let mut priority = 0.0;
        if e.source == node {
            priority += cfg.source_role_priority;
            let fan = self.out_degree[node];
            if fan > 1 {
                priority += cfg.fan_priority_factor * fan as f64;
            }
        }
        if e.target == node {
            priority += cfg.target_role_priority;
            let fan = self.in_degree[node];
            if fan > 1 {
                priority += cfg.fan_priority_factor * fan as f64;
            }
        }
        let crossing_cost = order[e.source].abs_diff(order[e.target]) as f64;
        priority + 1.0 / (crossing_cost + 1.0)
    }

    /// `edge_priority` plus the edge's weight from the previous sweep,
    /// squashed into `[0, 1)`.
    fn carried_priority(&self, edge: usize, node: usize, order: &[usize], run: &Run) -> f64 {
        let carried = run.edge_weights[edge].map_or(0.0, |w| {
            let w = w.max(0.0);
            w / (w + 1.0)
        });
        self.edge_priority(edge, node, order) + carried
    }

    /// Crossings between adjacent layers.
    fn count_crossings(&self, arrangement: &Arrangement) -> usize {
        let mut total = 0;
        for layer in arrangement.layers.iter().take(arrangement.layers.len().saturating_sub(1)) {
            let mut pairs: Vec<(usize, usize)> = Vec::new();
            for &v in layer {
                for u in self.adjacent(v, SweepDirection::Downward) {
                    pairs.push((arrangement.order[v], arrangement.order[u]));
                }
            }
            pairs.sort_unstable();
            let mut lower: Vec<usize> = pairs.into_iter().map(|(_, b)| b).collect();
            total += count_inversions(&mut lower);
        }
        total
    }

    /// Crossings among the adjacent-layer edges of two nodes in one layer, if
    /// `left` sits before `right`. Edges to `excluded` are not counted.
    pub fn local_crossings(
        &self,
        left: usize,
        right: usize,
        excluded: Option<usize>,
        order: &[usize],
    ) -> usize {
        let mut count = 0;
        for direction in [SweepDirection::Upward, SweepDirection::Downward] {
            for x in self.adjacent(left, direction).filter(|&x| Some(x) != excluded) {
                for y in self.adjacent(right, direction).filter(|&y| Some(y) != excluded) {
                    if order[x] > order[y] {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Swaps neighbors while that lowers their local crossings.
    fn transpose(&self, arrangement: &mut Arrangement) -> bool {
        let mut changed = false;
        let limit = self.graph.node_count().max(1);
        for _ in 0..limit {
            let mut improved = false;
            for layer in 0..arrangement.layers.len() {
                for i in 0..arrangement.layers[layer].len().saturating_sub(1) {
                    let a = arrangement.layers[layer][i];
                    let b = arrangement.layers[layer][i + 1];
                    if self.local_crossings(b, a, None, &arrangement.order)
                        < self.local_crossings(a, b, None, &arrangement.order)
                    {
                        arrangement.layers[layer].swap(i, i + 1);
                        arrangement.order[a] = i + 1;
                        arrangement.order[b] = i;
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
            changed = true;
        }
        changed
    }

    /// Re-sorts every layer in `direction`. Returns whether any order changed.
    fn sweep(&self, direction: SweepDirection, arrangement: &mut Arrangement, run: &mut Run) -> bool {
        let cfg = self.config;
        let layer_count = arrangement.layers.len();
        let layers: Vec<usize> = match direction {
            SweepDirection::Upward => (1..layer_count).collect(),
            SweepDirection::Downward => (0..layer_count.saturating_sub(1)).rev().collect(),
        };

        let mut changed = false;
        for layer in layers {
            let nodes = arrangement.layers[layer].clone();
            let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
            let mut loose = Vec::new();

            for &v in &nodes {
                let values: Vec<f64> = self
                    .adjacent_edges(v, direction)
                    .map(|(u, e)| {
                        let priority = self.carried_priority(e, v, &arrangement.order, run);
                        arrangement.order[u] as f64 - cfg.priority_bias * priority
                    })
                    .collect();
                let weight = match self.heuristic {
                    WeightHeuristic::Barycenter => barycenter(&values),
                    WeightHeuristic::Median => median(&values),
                };
                match weight {
                    Some(w) => {
                        weights.insert(v, w + cfg.node_fan_bias * self.out_degree[v] as f64);
                    }
                    None => loose.push(v),
                }
            }

            let max_weight = weights
                .values()
                .copied()
                .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
                .unwrap_or(nodes.len().saturating_sub(1) as f64);
            let span = nodes.len().saturating_sub(1).max(1) as f64;
            for v in loose {
                let relative = arrangement.order[v] as f64 / span;
                weights.insert(v, relative * max_weight);
            }

            for &v in &nodes {
                for (u, e) in self.adjacent_edges(v, direction) {
                    let edge = self.graph.edge(e);
                    let priority = self.edge_priority(e, v, &arrangement.order);
                    let fan = (self.out_degree[edge.source] + self.in_degree[edge.target]) as f64;
                    let neighbor_weight = run.node_weights[self.layer_of[u]]
                        .get(&u)
                        .copied()
                        .unwrap_or(arrangement.order[u] as f64);
                    let weight = (weights[&v] + neighbor_weight) / 2.0 + cfg.edge_fan_bias * fan
                        - cfg.priority_bias * priority;
                    run.edge_weights[e] = Some(weight);
                }
            }

            let mut sorted = nodes.clone();
            sorted.sort_by(|&a, &b| {
                weights[&a]
                    .total_cmp(&weights[&b])
                    .then(arrangement.order[a].cmp(&arrangement.order[b]))
            });
            if sorted != nodes {
                changed = true;
                arrangement.layers[layer] = sorted;
                arrangement.reindex(layer);
            }
            run.node_weights[layer] = weights;
        }
        changed
    }

    fn start_run(&self, arrangement: &Arrangement) -> Run {
        let crossings = self.count_crossings(arrangement);
        Run {
            arrangement: arrangement.clone(),
            crossings,
            history: vec![crossings],
            sweeps: 0,
            node_weights: vec![BTreeMap::new(); arrangement.layers.len()],
            edge_weights: vec![None; self.graph.edge_count()],
        }
    }

    fn minimize(&self, start: Vec<Vec<usize>>) -> Run {
        let mut arrangement = Arrangement::new(start, self.graph.node_count());
        let mut run = self.start_run(&arrangement);

        let mut quiet = 0;
        for sweep in 0..self.config.max_sweeps {
            if self.cancel.is_cancelled() {
                break;
            }
            let direction = if sweep % 2 == 0 {
                SweepDirection::Upward
            } else {
                SweepDirection::Downward
            };
            let mut changed = self.sweep(direction, &mut arrangement, &mut run);
            if self.config.transpose {
                changed |= self.transpose(&mut arrangement);
            }
            run.sweeps += 1;

            let crossings = self.count_crossings(&arrangement);
            let accepted = crossings <= run.crossings;
            if accepted {
                run.arrangement = arrangement.clone();
                run.crossings = crossings;
                run.history.push(crossings);
            } else {
                arrangement = run.arrangement.clone();
            }
            tracing::trace!(sweep, ?direction, crossings, accepted, "sweep finished");

            if changed {
                quiet = 0;
            } else {
                quiet += 1;
                if quiet >= 2 {
                    break;
                }
            }
        }
        run
    }

    /// Start order from a depth-first walk that begins at a random node and
    /// follows lighter edges first.
    fn randomized_start(
        &self,
        base: &[Vec<usize>],
        rng: &mut RandomUtils,
        edge_weight: &[Option<f64>],
    ) -> Vec<Vec<usize>> {
        let n = self.graph.node_count();
        if n == 0 {
            return base.to_vec();
        }
        let mut by_key: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut by_key);
        let mut keys = vec![0; n];
        for (rank, &v) in by_key.iter().enumerate() {
            keys[v] = rank;
        }
        let first = by_key[rng.next_bounded(n)];

        let mut discovered = vec![usize::MAX; n];
        let mut next_index = 0;
        for root in std::iter::once(first).chain(by_key.iter().copied()) {
            if discovered[root] != usize::MAX {
                continue;
            }
            let mut stack = vec![root];
            while let Some(v) = stack.pop() {
                if discovered[v] != usize::MAX {
                    continue;
                }
                discovered[v] = next_index;
                next_index += 1;

                let mut next: Vec<(usize, usize)> = self.upper[v]
                    .iter()
                    .chain(&self.lower[v])
                    .copied()
                    .filter(|&(u, _)| discovered[u] == usize::MAX)
                    .collect();
                let weight = |e: usize| edge_weight[e].unwrap_or(0.0);
                next.sort_by(|&(u1, e1), &(u2, e2)| {
                    weight(e2).total_cmp(&weight(e1)).then(keys[u2].cmp(&keys[u1]))
                });
                stack.extend(next.into_iter().map(|(u, _)| u));
            }
        }

        base.iter()
            .map(|layer| {
                let mut layer = layer.clone();
                layer.sort_by_key(|&v| discovered[v]);
                layer
            })
            .collect()
    }

    /// Orders every layer, starting from `initial`.
    pub fn sequence(&self, initial: Vec<Vec<usize>>) -> SequencingResult {
        let mut best = self.minimize(initial.clone());

        if self.config.randomize {
            let mut rng = RandomUtils::new(self.config.random_seed);
            tracing::trace!(seed = rng.seed(), restarts = self.config.random_restarts, "randomizing");
            for restart in 0..self.config.random_restarts {
                if self.cancel.is_cancelled() {
                    break;
                }
                let start = self.randomized_start(&initial, &mut rng, &best.edge_weights);
                let candidate = self.minimize(start);
                tracing::debug!(restart, crossings = candidate.crossings, "randomized restart");
                if candidate.crossings < best.crossings {
                    best = candidate;
                }
            }
        }

        tracing::debug!(
            crossings = best.crossings,
            sweeps = best.sweeps,
            "sequencing finished"
        );
        SequencingResult {
            layers: best.arrangement.layers,
            crossings: best.crossings,
            crossing_history: best.history,
            sweeps: best.sweeps,
        }
    }
}
