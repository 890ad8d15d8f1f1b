//! Breadth-first and depth-first walks that record parent/child links and the
//! depth at which each node was first reached.

use super::graph::LayoutGraph;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a caller and a layout run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Parent/child links and first-discovery depths, keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalResult {
    pub root_node: Option<String>,
    pub node_children: BTreeMap<String, Vec<String>>,
    pub node_layers: BTreeMap<String, usize>,
}

impl TraversalResult {
    /// Children lists are concatenated; depths already known are kept.
    pub fn merge(&mut self, other: TraversalResult) {
        if self.root_node.is_none() {
            self.root_node = other.root_node;
        }
        for (parent, children) in other.node_children {
            self.node_children.entry(parent).or_default().extend(children);
        }
        for (node, depth) in other.node_layers {
            self.node_layers.entry(node).or_insert(depth);
        }
    }

    /// Depth of `id`, 0 when the walk never reached it.
    pub fn depth_of(&self, id: &str) -> usize {
        self.node_layers.get(id).copied().unwrap_or(0)
    }

    /// How often each node was discovered as somebody's child.
    pub fn parent_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for children in self.node_children.values() {
            for child in children {
                *counts.entry(child.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Walk order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalKind {
    /// FIFO queue, suited to wide and shallow graphs
    BreadthFirst,
    /// Explicit LIFO stack, suited to deep hierarchies
    DepthFirst,
}

enum Frame {
    Enter {
        node: usize,
        parent: Option<usize>,
        depth: usize,
    },
    Exit(usize),
}

/// Nodes without visible incoming edges. Self-loops do not count.
pub fn find_start_nodes(graph: &LayoutGraph) -> Vec<usize> {
    (0..graph.node_count())
        .filter(|&n| graph.in_degree(n) == 0)
        .collect()
}

impl TraversalKind {
    pub fn name(self) -> &'static str {
        match self {
            TraversalKind::BreadthFirst => "breadth-first",
            TraversalKind::DepthFirst => "depth-first",
        }
    }

    /// Walks from `start` along visible outgoing edges. Stops early, leaving a
    /// partial result, once `cancel` is set.
    pub fn traverse(
        self,
        graph: &LayoutGraph,
        start: usize,
        cancel: &CancellationToken,
    ) -> TraversalResult {
        let mut walk = Walk::new(graph.node_count());
        match self {
            TraversalKind::BreadthFirst => walk.breadth_first(graph, start, cancel),
            TraversalKind::DepthFirst => walk.depth_first(graph, start, cancel),
        }
        walk.into_result(graph, start)
    }

    /// Walks from every start node, then from any node still unreached (nodes
    /// that only sit on cycles), merging the partial results.
    pub fn traverse_all(self, graph: &LayoutGraph, cancel: &CancellationToken) -> TraversalResult {
        let mut result = TraversalResult::default();
        for start in find_start_nodes(graph) {
            if cancel.is_cancelled() {
                return result;
            }
            result.merge(self.traverse(graph, start, cancel));
        }

        for node in 0..graph.node_count() {
            if cancel.is_cancelled() {
                break;
            }
            if !result.node_layers.contains_key(&graph.node(node).id) {
                result.merge(self.traverse(graph, node, cancel));
            }
        }

        tracing::debug!(
            kind = self.name(),
            reached = result.node_layers.len(),
            "traversal finished"
        );
        result
    }
}

struct Walk {
    state: Vec<VisitState>,
    children: Vec<Vec<usize>>,
    depths: Vec<Option<usize>>,
}

impl Walk {
    fn new(node_count: usize) -> Self {
        Self {
            state: vec![VisitState::Unvisited; node_count],
            children: vec![Vec::new(); node_count],
            depths: vec![None; node_count],
        }
    }

    fn breadth_first(&mut self, graph: &LayoutGraph, start: usize, cancel: &CancellationToken) {
        let mut queue: VecDeque<(usize, Option<usize>, usize)> = VecDeque::new();
        queue.push_back((start, None, 1));
        self.state[start] = VisitState::InProgress;

        while let Some((node, parent, depth)) = queue.pop_front() {
            if cancel.is_cancelled() {
                return;
            }
            self.depths[node] = Some(depth);
            if let Some(parent) = parent {
                self.children[parent].push(node);
            }
            for child in graph.successors(node) {
                if self.state[child] == VisitState::Unvisited {
                    self.state[child] = VisitState::InProgress;
                    queue.push_back((child, Some(node), depth + 1));
                }
            }
            self.state[node] = VisitState::Done;
        }
    }

    fn depth_first(&mut self, graph: &LayoutGraph, start: usize, cancel: &CancellationToken) {
        let mut stack = vec![Frame::Enter {
            node: start,
            parent: None,
            depth: 1,
        }];

        while let Some(frame) = stack.pop() {
            if cancel.is_cancelled() {
                return;
            }
            match frame {
                Frame::Exit(node) => self.state[node] = VisitState::Done,
                Frame::Enter {
                    node,
                    parent,
                    depth,
                } => {
                    if self.state[node] != VisitState::Unvisited {
                        continue;
                    }
                    self.state[node] = VisitState::InProgress;
                    self.depths[node] = Some(depth);
                    if let Some(parent) = parent {
                        self.children[parent].push(node);
                    }
                    stack.push(Frame::Exit(node));
                    let successors: Vec<usize> = graph.successors(node).collect();
                    for &child in successors.iter().rev() {
                        if self.state[child] == VisitState::Unvisited {
                            stack.push(Frame::Enter {
                                node: child,
                                parent: Some(node),
                                depth: depth + 1,
                            });
                        }
                    }
                }
            }
        }
    }

    fn into_result(self, graph: &LayoutGraph, start: usize) -> TraversalResult {
        let id = |n: usize| graph.node(n).id.clone();
        let mut result = TraversalResult {
            root_node: Some(id(start)),
            ..TraversalResult::default()
        };
        for (node, children) in self.children.into_iter().enumerate() {
            if !children.is_empty() {
                result
                    .node_children
                    .insert(id(node), children.into_iter().map(id).collect());
            }
        }
        for (node, depth) in self.depths.into_iter().enumerate() {
            if let Some(depth) = depth {
                result.node_layers.insert(id(node), depth);
            }
        }
        result
    }
}
