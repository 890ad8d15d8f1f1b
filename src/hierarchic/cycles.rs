//! Cycle removal ahead of rank assignment.
//!
//! The weighted remover is a greedy feedback-arc-set heuristic: nodes leave a
//! priority queue least-constrained first, and each decides whether it acts
//! as a source or a sink for the edges it still shares with the rest of the
//! graph.

use super::graph::{GraphEdge, LayoutGraph};
use super::traversal::VisitState;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Supplies the weight of an edge for cycle removal.
pub trait EdgeWeightProvider {
    fn weight(&self, edge: &GraphEdge) -> f64;
}

/// Every edge weighs 1
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitWeights;

impl EdgeWeightProvider for UnitWeights {
    fn weight(&self, _edge: &GraphEdge) -> f64 {
        1.0
    }
}

/// Weights by edge id; unlisted edges weigh 1.
impl EdgeWeightProvider for HashMap<String, f64> {
    fn weight(&self, edge: &GraphEdge) -> f64 {
        self.get(&edge.id).copied().unwrap_or(1.0)
    }
}

/// Per-edge outcome of cycle removal, indexed like the graph's edges
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleRemoval {
    pub reversed: Vec<bool>,
    /// Self-loops and the folded half of anti-parallel pairs
    pub hidden: Vec<bool>,
}

impl CycleRemoval {
    fn new(edge_count: usize) -> Self {
        Self {
            reversed: vec![false; edge_count],
            hidden: vec![false; edge_count],
        }
    }

    pub fn reversed_count(&self) -> usize {
        self.reversed.iter().filter(|&&r| r).count()
    }

    /// True if `edge` should take part in ranking.
    pub fn keeps(&self, edge: usize) -> bool {
        !self.reversed[edge] && !self.hidden[edge]
    }

    /// Adds the decisions of another run over a disjoint set of edges.
    pub fn absorb(&mut self, other: &CycleRemoval) {
        for (mine, theirs) in self.reversed.iter_mut().zip(&other.reversed) {
            *mine |= *theirs;
        }
        for (mine, theirs) in self.hidden.iter_mut().zip(&other.hidden) {
            *mine |= *theirs;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority(f64);

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Min-priority queue over node indices with changeable keys. Ties pop the
/// lower node index first.
struct NodeQueue {
    entries: BTreeSet<(Priority, usize)>,
    current: Vec<Option<Priority>>,
}

impl NodeQueue {
    fn new(node_count: usize) -> Self {
        Self {
            entries: BTreeSet::new(),
            current: vec![None; node_count],
        }
    }

    fn push(&mut self, node: usize, priority: f64) {
        let priority = Priority(priority);
        self.current[node] = Some(priority);
        self.entries.insert((priority, node));
    }

    fn update(&mut self, node: usize, priority: f64) {
        if let Some(old) = self.current[node] {
            self.entries.remove(&(old, node));
            self.push(node, priority);
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let (_, node) = self.entries.pop_first()?;
        self.current[node] = None;
        Some(node)
    }
}

/// Greedy weighted cycle removal restricted to `nodes` (typically one
/// connected component).
pub fn remove_cycles_weighted(
    graph: &LayoutGraph,
    nodes: &[usize],
    weights: &dyn EdgeWeightProvider,
) -> CycleRemoval {
    let mut removal = CycleRemoval::new(graph.edge_count());
    let mut member = vec![false; graph.node_count()];
    for &n in nodes {
        member[n] = true;
    }

    let mut edge_weight = vec![0.0; graph.edge_count()];
    let mut by_direction: HashMap<(usize, usize), usize> = HashMap::new();
    let mut active = Vec::new();

    for (e, edge) in graph.edges().iter().enumerate() {
        if edge.hidden || !member[edge.source] || !member[edge.target] {
            continue;
        }
        if edge.is_self_loop() {
            removal.hidden[e] = true;
            continue;
        }
        edge_weight[e] = weights.weight(edge);
        if let Some(&opposite) = by_direction.get(&(edge.target, edge.source)) {
            edge_weight[opposite] += edge_weight[e];
            removal.hidden[e] = true;
            continue;
        }
        by_direction.entry((edge.source, edge.target)).or_insert(e);
        active.push(e);
    }

    if active.len() < 2 || nodes.len() < 2 {
        return removal;
    }

    let mut in_weight = vec![0.0; graph.node_count()];
    let mut out_weight = vec![0.0; graph.node_count()];
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); graph.node_count()];
    let mut in_edges: Vec<Vec<usize>> = vec![Vec::new(); graph.node_count()];
    for &e in &active {
        let edge = graph.edge(e);
        out_weight[edge.source] += edge_weight[e];
        in_weight[edge.target] += edge_weight[e];
        out_edges[edge.source].push(e);
        in_edges[edge.target].push(e);
    }

    let mut queue = NodeQueue::new(graph.node_count());
    for &n in nodes {
        queue.push(n, f64::min(out_weight[n], in_weight[n]));
    }

    let mut visited = vec![false; graph.edge_count()];
    while let Some(node) = queue.pop() {
        // A node with at least as much incoming as outgoing weight acts as a
        // sink: its remaining outgoing edges point backward.
        let sink_like = in_weight[node] >= out_weight[node];

        for &e in &out_edges[node] {
            if visited[e] {
                continue;
            }
            visited[e] = true;
            removal.reversed[e] = sink_like;
            let other = graph.edge(e).target;
            in_weight[other] -= edge_weight[e];
            queue.update(other, f64::min(out_weight[other], in_weight[other]));
        }
        for &e in &in_edges[node] {
            if visited[e] {
                continue;
            }
            visited[e] = true;
            removal.reversed[e] = !sink_like;
            let other = graph.edge(e).source;
            out_weight[other] -= edge_weight[e];
            queue.update(other, f64::min(out_weight[other], in_weight[other]));
        }
    }

    removal
}

/// Reverses the back edges found by an iterative depth-first search over
/// `nodes`, visiting roots in index order.
pub fn remove_cycles_dfs(graph: &LayoutGraph, nodes: &[usize]) -> CycleRemoval {
    let mut removal = CycleRemoval::new(graph.edge_count());
    let mut state = vec![VisitState::Unvisited; graph.node_count()];
    let mut member = vec![false; graph.node_count()];
    for &n in nodes {
        member[n] = true;
    }

    for &root in nodes {
        if state[root] != VisitState::Unvisited {
            continue;
        }
        state[root] = VisitState::InProgress;
        let mut stack: Vec<(usize, Vec<usize>, usize)> =
            vec![(root, graph.outgoing(root).collect(), 0)];

        while let Some((node, edges, cursor)) = stack.last_mut() {
            let Some(&e) = edges.get(*cursor) else {
                state[*node] = VisitState::Done;
                stack.pop();
                continue;
            };
            *cursor += 1;

            let edge = graph.edge(e);
            if edge.is_self_loop() {
                removal.hidden[e] = true;
                continue;
            }
            if !member[edge.target] {
                continue;
            }
            match state[edge.target] {
                VisitState::InProgress => removal.reversed[e] = true,
                VisitState::Done => {}
                VisitState::Unvisited => {
                    let next = edge.target;
                    state[next] = VisitState::InProgress;
                    stack.push((next, graph.outgoing(next).collect(), 0));
                }
            }
        }
    }

    removal
}

/// Checks that the visible edges, with reversed ones flipped, form no
/// directed cycle.
pub fn is_acyclic(graph: &LayoutGraph, removal: &CycleRemoval) -> bool {
    let n = graph.node_count();
    let mut indegree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (e, edge) in graph.visible_edges() {
        if removal.hidden[e] {
            continue;
        }
        let (from, to) = if removal.reversed[e] {
            (edge.target, edge.source)
        } else {
            (edge.source, edge.target)
        };
        adjacency[from].push(to);
        indegree[to] += 1;
    }

    let mut ready: Vec<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
    let mut seen = 0;
    while let Some(v) = ready.pop() {
        seen += 1;
        for &w in &adjacency[v] {
            indegree[w] -= 1;
            if indegree[w] == 0 {
                ready.push(w);
            }
        }
    }
    seen == n
}
