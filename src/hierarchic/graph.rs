//! Index-based view of a lineage graph for one layout run.
//!
//! Nodes and edges are addressed by their position in the input arrays; each
//! node keeps the indices of its outgoing and incoming edges.

use super::types::{LineageEdge, LineageNode};
use std::collections::{BTreeSet, HashMap};

/// An edge resolved to node indices
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: usize,
    pub target: usize,
    /// Set when cycle removal decided this edge runs against the flow
    pub reversed: bool,
    /// Hidden edges are ignored by every layout phase
    pub hidden: bool,
}

impl GraphEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Endpoint opposite to `node`.
    pub fn opposite(&self, node: usize) -> usize {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutGraph {
    nodes: Vec<LineageNode>,
    edges: Vec<GraphEdge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl LayoutGraph {
    /// Builds the graph, skipping edges with unknown endpoints and repeated
    /// node or edge ids (the first occurrence wins).
    pub fn new(nodes: Vec<LineageNode>, edges: &[LineageEdge]) -> Self {
        let mut graph = LayoutGraph::default();

        for node in nodes {
            if graph.node_index.contains_key(&node.id) {
                tracing::warn!(node = %node.id, "duplicate node id, keeping the first");
                continue;
            }
            graph.node_index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }
        graph.outgoing = vec![Vec::new(); graph.nodes.len()];
        graph.incoming = vec![Vec::new(); graph.nodes.len()];

        for edge in edges {
            let (Some(&source), Some(&target)) = (
                graph.node_index.get(&edge.source),
                graph.node_index.get(&edge.target),
            ) else {
                tracing::warn!(
                    edge = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "edge references a missing node, skipping"
                );
                continue;
            };
            if graph.edge_index.contains_key(&edge.id) {
                tracing::warn!(edge = %edge.id, "duplicate edge id, keeping the first");
                continue;
            }
            let index = graph.edges.len();
            graph.edge_index.insert(edge.id.clone(), index);
            graph.outgoing[source].push(index);
            graph.incoming[target].push(index);
            graph.edges.push(GraphEdge {
                id: edge.id.clone(),
                source,
                target,
                reversed: false,
                hidden: false,
            });
        }

        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[LineageNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &LineageNode {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut LineageNode {
        &mut self.nodes[index]
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> &GraphEdge {
        &self.edges[index]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn edge_index_of(&self, id: &str) -> Option<usize> {
        self.edge_index.get(id).copied()
    }

    /// Visible outgoing edge indices of `node`.
    pub fn outgoing(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing[node]
            .iter()
            .copied()
            .filter(|&e| !self.edges[e].hidden)
    }

    /// Visible incoming edge indices of `node`.
    pub fn incoming(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.incoming[node]
            .iter()
            .copied()
            .filter(|&e| !self.edges[e].hidden)
    }

    /// Visible edges touching `node`, outgoing first.
    pub fn incident(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing(node).chain(self.incoming(node))
    }

    pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing(node).map(|e| self.edges[e].target)
    }

    /// Visible in-degree, not counting self-loops.
    pub fn in_degree(&self, node: usize) -> usize {
        self.incoming(node)
            .filter(|&e| !self.edges[e].is_self_loop())
            .count()
    }

    /// Visible out-degree, not counting self-loops.
    pub fn out_degree(&self, node: usize) -> usize {
        self.outgoing(node)
            .filter(|&e| !self.edges[e].is_self_loop())
            .count()
    }

    /// Visible edges that are not self-loops.
    pub fn visible_edges(&self) -> impl Iterator<Item = (usize, &GraphEdge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.hidden && !e.is_self_loop())
    }

    pub fn set_reversed(&mut self, edge: usize, reversed: bool) {
        self.edges[edge].reversed = reversed;
    }

    pub fn set_hidden(&mut self, edge: usize, hidden: bool) {
        self.edges[edge].hidden = hidden;
    }

    pub fn clear_reversed(&mut self) {
        for edge in &mut self.edges {
            edge.reversed = false;
        }
    }

    /// Weakly connected components over visible edges, each sorted by node
    /// index, ordered by their smallest node.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut component_of = vec![usize::MAX; self.nodes.len()];
        let mut components = Vec::new();

        for start in 0..self.nodes.len() {
            if component_of[start] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component_of[start] = id;

            while let Some(node) = stack.pop() {
                members.push(node);
                for e in self.incident(node) {
                    let other = self.edges[e].opposite(node);
                    if component_of[other] == usize::MAX {
                        component_of[other] = id;
                        stack.push(other);
                    }
                }
            }

            members.sort_unstable();
            components.push(members);
        }

        components
    }

    /// Every node and edge reachable from `node_id` ignoring direction,
    /// including the node itself. `None` for unknown ids.
    pub fn find_all_connected_elements(&self, node_id: &str) -> Option<ConnectedElements> {
        let start = self.index_of(node_id)?;
        let mut seen_nodes = vec![false; self.nodes.len()];
        let mut edge_ids = BTreeSet::new();
        let mut node_ids = BTreeSet::new();
        let mut stack = vec![start];
        seen_nodes[start] = true;

        while let Some(node) = stack.pop() {
            node_ids.insert(self.nodes[node].id.clone());
            for e in self.incident(node) {
                edge_ids.insert(self.edges[e].id.clone());
                let other = self.edges[e].opposite(node);
                if !seen_nodes[other] {
                    seen_nodes[other] = true;
                    stack.push(other);
                }
            }
        }

        Some(ConnectedElements {
            node_ids: node_ids.into_iter().collect(),
            edge_ids: edge_ids.into_iter().collect(),
        })
    }

    /// Edges back in input form, endpoints as ids.
    pub fn lineage_edges(&self) -> Vec<LineageEdge> {
        self.edges
            .iter()
            .map(|e| {
                LineageEdge::new(
                    e.id.clone(),
                    self.nodes[e.source].id.clone(),
                    self.nodes[e.target].id.clone(),
                )
            })
            .collect()
    }

    /// Subgraph with only the nodes `keep` accepts, and the edges between
    /// them. Edge flags carry over.
    pub fn filtered(&self, keep: impl Fn(&LineageNode) -> bool) -> LayoutGraph {
        let kept: Vec<bool> = self.nodes.iter().map(&keep).collect();
        let nodes: Vec<LineageNode> = self
            .nodes
            .iter()
            .zip(&kept)
            .filter(|(_, k)| **k)
            .map(|(n, _)| n.clone())
            .collect();
        let edges: Vec<LineageEdge> = self
            .lineage_edges()
            .into_iter()
            .zip(&self.edges)
            .filter(|(_, e)| kept[e.source] && kept[e.target])
            .map(|(edge, _)| edge)
            .collect();
        let mut sub = LayoutGraph::new(nodes, &edges);
        for edge in &mut sub.edges {
            if let Some(&original) = self.edge_index.get(&edge.id) {
                edge.reversed = self.edges[original].reversed;
                edge.hidden = self.edges[original].hidden;
            }
        }
        sub
    }
}

/// Ids reachable from a node, sorted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectedElements {
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> LayoutGraph {
        let nodes = nodes.iter().map(|id| LineageNode::new(*id)).collect();
        let edges: Vec<LineageEdge> = edges
            .iter()
            .enumerate()
            .map(|(i, (s, t))| LineageEdge::new(format!("e{i}"), *s, *t))
            .collect();
        LayoutGraph::new(nodes, &edges)
    }

    #[test]
    fn edges_with_missing_endpoints_are_skipped() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "ghost"), ("ghost", "b")]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.successors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(g.in_degree(1), 1);
    }

    #[test]
    fn duplicate_ids_keep_the_first_occurrence() {
        let nodes = vec![
            LineageNode::new("a").at(1.0, 1.0),
            LineageNode::new("a").at(9.0, 9.0),
            LineageNode::new("b"),
        ];
        let edges = vec![LineageEdge::new("x", "a", "b"), LineageEdge::new("x", "b", "a")];
        let g = LayoutGraph::new(nodes, &edges);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.node(0).position.x, 1.0);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(0).target, 1);
    }

    #[test]
    fn hidden_edges_drop_out_of_adjacency() {
        let mut g = graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
        g.set_hidden(1, true);
        assert_eq!(g.successors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(g.out_degree(0), 1);
        assert_eq!(g.components(), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn self_loops_do_not_count_toward_degree() {
        let g = graph(&["a"], &[("a", "a")]);
        assert_eq!(g.in_degree(0), 0);
        assert_eq!(g.out_degree(0), 0);
        assert_eq!(g.visible_edges().count(), 0);
    }

    #[test]
    fn components_ignore_direction() {
        let g = graph(&["a", "b", "c", "d", "e"], &[("b", "a"), ("c", "b"), ("e", "d")]);
        assert_eq!(g.components(), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn connected_elements_walk_both_directions() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "b")]);
        let found = g.find_all_connected_elements("c").unwrap();
        assert_eq!(found.node_ids, vec!["a", "b", "c"]);
        assert_eq!(found.edge_ids, vec!["e0", "e1"]);
        assert!(g.find_all_connected_elements("zzz").is_none());
    }

    #[test]
    fn filtered_subgraph_keeps_edge_flags() {
        let mut g = graph(&["a", "b", "g"], &[("a", "b"), ("a", "g"), ("b", "a")]);
        g.set_hidden(2, true);
        let sub = g.filtered(|n| n.id != "g");
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 2);
        assert!(sub.edge(sub.edge_index_of("e2").unwrap()).hidden);
        assert_eq!(sub.edge_index_of("e1"), None);
    }

    struct WarnCount(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCount {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCount(Arc::clone(&count)));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn filtering_out_nodes_drops_their_edges_quietly() {
        let g = graph(&["a", "b", "g"], &[("a", "b"), ("g", "a"), ("b", "g")]);
        let mut sub = LayoutGraph::default();
        assert_eq!(warnings_during(|| sub = g.filtered(|n| n.id != "g")), 0);
        assert_eq!(sub.edge_count(), 1);

        let broken = warnings_during(|| {
            LayoutGraph::new(vec![LineageNode::new("a")], &[LineageEdge::new("e", "a", "nowhere")]);
        });
        assert_eq!(broken, 1);
    }
}
