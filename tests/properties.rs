use lineage_layout::config::{LayeringStrategy, LayoutConfig, Orientation, WeightHeuristic};
use lineage_layout::hierarchic::cycles::{UnitWeights, is_acyclic, remove_cycles_dfs, remove_cycles_weighted};
use lineage_layout::hierarchic::{HierarchicLayout, LayoutGraph, LayoutResult, LineageEdge, LineageNode};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn graph_input() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..10).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..18)))
}

fn strategy() -> impl Strategy<Value = LayeringStrategy> {
    prop::sample::select(vec![
        LayeringStrategy::Default,
        LayeringStrategy::Topological,
        LayeringStrategy::Bfs,
        LayeringStrategy::Weighted,
    ])
}

fn build(n: usize, pairs: &[(usize, usize)]) -> (Vec<LineageNode>, Vec<LineageEdge>) {
    let nodes = (0..n)
        .map(|i| LineageNode::new(format!("n{i}")).at((i % 4) as f64 * 80.0, (i / 4) as f64 * 60.0))
        .collect();
    let edges = pairs
        .iter()
        .enumerate()
        .map(|(i, (s, t))| LineageEdge::new(format!("e{i}"), format!("n{s}"), format!("n{t}")))
        .collect();
    (nodes, edges)
}

fn layout(
    n: usize,
    pairs: &[(usize, usize)],
    strategy: LayeringStrategy,
    heuristic: WeightHeuristic,
    orientation: Orientation,
) -> LayoutResult {
    let (nodes, edges) = build(n, pairs);
    let config = LayoutConfig {
        layering_strategy: strategy,
        weight_heuristic: heuristic,
        layout_orientation: orientation,
        ..LayoutConfig::default()
    };
    HierarchicLayout::new(nodes, edges, config)
        .execute_layout()
        .unwrap()
        .completed()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn layers_partition_the_nodes((n, pairs) in graph_input(), strategy in strategy()) {
        let result = layout(n, &pairs, strategy, WeightHeuristic::Barycenter, Orientation::LeftToRight);
        let layers = result.layers.unwrap();

        let keys: Vec<usize> = layers.layered_graph.keys().copied().collect();
        prop_assert_eq!(keys, (0..layers.layer_count).collect::<Vec<_>>());
        prop_assert!(layers.layered_graph.values().all(|l| !l.is_empty()));

        let mut seen = BTreeSet::new();
        for id in layers.layered_graph.values().flatten() {
            prop_assert!(seen.insert(id.clone()), "{} appears twice", id);
        }
        prop_assert_eq!(seen.len(), n);
        prop_assert_eq!(result.positions.len(), n);
    }

    #[test]
    fn sequence_holds_the_same_layers((n, pairs) in graph_input(), strategy in strategy()) {
        let result = layout(n, &pairs, strategy, WeightHeuristic::Median, Orientation::TopToBottom);
        let layers = result.layers.unwrap();
        let sequence = result.sequence.unwrap();

        prop_assert_eq!(sequence.layers.len(), layers.layer_count);
        for (index, ordered) in sequence.layers.iter().enumerate() {
            let a: BTreeSet<&String> = ordered.iter().collect();
            let b: BTreeSet<&String> = layers.layered_graph[&index].iter().collect();
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn accepted_crossing_estimates_never_grow((n, pairs) in graph_input(), strategy in strategy()) {
        for heuristic in [WeightHeuristic::Barycenter, WeightHeuristic::Median] {
            let result = layout(n, &pairs, strategy, heuristic, Orientation::LeftToRight);
            let history = result.sequence.unwrap().crossing_history;
            prop_assert!(!history.is_empty());
            prop_assert!(history.windows(2).all(|w| w[1] <= w[0]), "{:?}", history);
            prop_assert_eq!(result.crossings, history.last().copied());
        }
    }

    #[test]
    fn layout_is_deterministic((n, pairs) in graph_input(), strategy in strategy()) {
        let first = layout(n, &pairs, strategy, WeightHeuristic::Barycenter, Orientation::RightToLeft);
        let second = layout(n, &pairs, strategy, WeightHeuristic::Barycenter, Orientation::RightToLeft);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn cycle_removal_leaves_a_dag((n, pairs) in graph_input()) {
        let (nodes, edges) = build(n, &pairs);
        let graph = LayoutGraph::new(nodes, &edges);
        let all: Vec<usize> = (0..graph.node_count()).collect();

        prop_assert!(is_acyclic(&graph, &remove_cycles_weighted(&graph, &all, &UnitWeights)));
        prop_assert!(is_acyclic(&graph, &remove_cycles_dfs(&graph, &all)));
    }

    #[test]
    fn nodes_in_a_layer_do_not_overlap((n, pairs) in graph_input(), strategy in strategy()) {
        let result = layout(n, &pairs, strategy, WeightHeuristic::Barycenter, Orientation::LeftToRight);
        for ids in result.layers.unwrap().layered_graph.values() {
            let mut ys: Vec<f64> = ids.iter().map(|id| result.positions[id].y).collect();
            ys.sort_by(f64::total_cmp);
            prop_assert!(ys.windows(2).all(|w| w[1] - w[0] >= 30.0), "{:?}", ys);
        }
    }
}
