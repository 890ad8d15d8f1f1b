use lineage_layout::cli;
use lineage_layout::config::{LayeringStrategy, LayoutConfig, Orientation};
use lineage_layout::hierarchic::{
    BuiltinStage, HierarchicLayout, LayerType, LayoutContext, LayoutOutcome, LayoutResult,
    LayoutStage, LineageEdge, LineageNode, Next, Point,
};
use lineage_layout::LayoutError;
use std::collections::HashMap;
use std::path::PathBuf;

fn edges(pairs: &[(&str, &str)]) -> Vec<LineageEdge> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (s, t))| LineageEdge::new(format!("e{i}"), *s, *t))
        .collect()
}

fn nodes(ids: &[&str]) -> Vec<LineageNode> {
    ids.iter().map(|id| LineageNode::new(*id)).collect()
}

fn config(strategy: LayeringStrategy, orientation: Orientation) -> LayoutConfig {
    LayoutConfig {
        layering_strategy: strategy,
        layout_orientation: orientation,
        ..LayoutConfig::default()
    }
}

fn run(layout: &HierarchicLayout) -> LayoutResult {
    match layout.execute_layout().expect("layout should succeed") {
        LayoutOutcome::Completed(result) => result,
        LayoutOutcome::Cancelled => panic!("layout was cancelled"),
    }
}

const GRAPH_STRATEGIES: [LayeringStrategy; 3] = [
    LayeringStrategy::Topological,
    LayeringStrategy::Bfs,
    LayeringStrategy::Weighted,
];

#[test]
fn two_node_chain_is_one_layer_gap_apart() {
    for strategy in GRAPH_STRATEGIES {
        let layout = HierarchicLayout::new(
            nodes(&["1", "2"]),
            edges(&[("1", "2")]),
            config(strategy, Orientation::LeftToRight),
        );
        let result = run(&layout);
        let layers = result.layers.expect("layer map");
        assert_eq!(layers.layer_of("1"), Some(0), "{strategy}");
        assert_eq!(layers.layer_of("2"), Some(1), "{strategy}");

        let (p1, p2) = (result.positions["1"], result.positions["2"]);
        assert_eq!(p2.x - p1.x, 30.0 + 50.0 + 20.0, "{strategy}");
        assert_eq!(p1.y, p2.y);
    }
}

#[test]
fn top_to_bottom_chain_advances_on_y() {
    let layout = HierarchicLayout::new(
        nodes(&["1", "2"]),
        edges(&[("1", "2")]),
        config(LayeringStrategy::Topological, Orientation::TopToBottom),
    );
    let result = run(&layout);
    assert_eq!(result.positions["1"], Point::new(0.0, 0.0));
    assert_eq!(result.positions["2"], Point::new(0.0, 100.0));
}

#[test]
fn bottom_to_top_chain_runs_upward() {
    let layout = HierarchicLayout::new(
        nodes(&["1", "2"]),
        edges(&[("1", "2")]),
        config(LayeringStrategy::Weighted, Orientation::BottomToTop),
    );
    let result = run(&layout);
    assert!(result.positions["1"].y > result.positions["2"].y);
    assert_eq!(result.positions["2"].y, 0.0);
}

#[test]
fn diamond_keeps_the_middle_pair_in_order() {
    let diamond = edges(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
    for heuristic in ["BARYCENTER", "MEDIAN"] {
        for strategy in GRAPH_STRATEGIES {
            let mut layout = HierarchicLayout::new(
                nodes(&["A", "B", "C", "D"]),
                diamond.clone(),
                config(strategy, Orientation::LeftToRight),
            );
            layout.set_weight_heuristic(heuristic).unwrap();
            let result = run(&layout);

            let layers = result.layers.expect("layer map");
            assert_eq!(layers.layer_of("A"), Some(0));
            assert_eq!(layers.layer_of("B"), Some(1));
            assert_eq!(layers.layer_of("C"), Some(1));
            assert_eq!(layers.layer_of("D"), Some(2));

            let sequence = result.sequence.expect("sequence");
            assert_eq!(sequence.layers[1], vec!["B", "C"], "{strategy} {heuristic}");
            assert_eq!(result.crossings, Some(0));
        }
    }
}

#[test]
fn three_cycle_reverses_exactly_one_edge() {
    for strategy in [LayeringStrategy::Weighted, LayeringStrategy::Topological] {
        let layout = HierarchicLayout::new(
            nodes(&["A", "B", "C"]),
            edges(&[("A", "B"), ("B", "C"), ("C", "A")]),
            config(strategy, Orientation::LeftToRight),
        );
        let layers = run(&layout).layers.expect("layer map");
        assert_eq!(layers.layer_count, 3);
        assert_eq!(layers.reversed_edges.len(), 1, "{strategy}");
    }

    let layout = HierarchicLayout::new(
        nodes(&["A", "B", "C"]),
        edges(&[("A", "B"), ("B", "C"), ("C", "A")]),
        config(LayeringStrategy::Weighted, Orientation::LeftToRight),
    );
    let layers = run(&layout).layers.expect("layer map");
    assert_eq!(layers.reversed_edges, vec!["e0"]);
    assert_eq!(layers.layer_of("B"), Some(0));
    assert_eq!(layers.layer_of("A"), Some(2));
}

#[test]
fn heavy_edges_steer_cycle_removal() {
    let mut layout = HierarchicLayout::new(
        nodes(&["A", "B", "C"]),
        edges(&[("A", "B"), ("B", "C"), ("C", "A")]),
        config(LayeringStrategy::Weighted, Orientation::LeftToRight),
    );
    layout.set_edge_weights(HashMap::from([("e0".to_string(), 5.0), ("e1".to_string(), 5.0)]));
    let layers = run(&layout).layers.expect("layer map");
    assert_eq!(layers.reversed_edges, vec!["e2"]);
}

#[test]
fn isolated_node_lands_in_layer_zero() {
    for strategy in GRAPH_STRATEGIES.into_iter().chain([LayeringStrategy::Default]) {
        let layout = HierarchicLayout::new(
            nodes(&["a", "b", "c", "lone"]),
            edges(&[("a", "b"), ("b", "c")]),
            config(strategy, Orientation::TopToBottom),
        );
        let result = run(&layout);
        assert_eq!(result.layers.unwrap().layer_of("lone"), Some(0), "{strategy}");
        assert!(result.positions.contains_key("lone"));
    }
}

#[test]
fn sketch_strategy_keeps_a_far_isolated_node_in_layer_zero() {
    let layout = HierarchicLayout::new(
        vec![
            LineageNode::new("a").at(0.0, 0.0),
            LineageNode::new("b").at(300.0, 0.0),
            LineageNode::new("lonely").at(900.0, 0.0),
        ],
        edges(&[("a", "b")]),
        config(LayeringStrategy::Default, Orientation::LeftToRight),
    );
    let layers = run(&layout).layers.unwrap();
    assert_eq!(layers.layer_of("a"), Some(0));
    assert_eq!(layers.layer_of("b"), Some(1));
    assert_eq!(layers.layer_of("lonely"), Some(0));
    assert_eq!(layers.layer_count, 2);
}

#[test]
fn label_layer_is_as_thick_as_its_widest_node() {
    let placed = |layer_type: LayerType| {
        let layout = HierarchicLayout::new(
            vec![
                LineageNode::new("a"),
                LineageNode::new("label").with_size(90.0, 20.0).with_layer_type(layer_type),
                LineageNode::new("c"),
            ],
            edges(&[("a", "label"), ("label", "c")]),
            config(LayeringStrategy::Topological, Orientation::TopToBottom),
        );
        run(&layout).positions
    };

    let labelled = placed(LayerType::Label);
    assert_eq!(labelled["a"].y, 0.0);
    assert_eq!(labelled["label"].y, 100.0 + (90.0 - 20.0) / 2.0);
    assert_eq!(labelled["c"].y, 100.0 + 90.0 + 70.0);

    let plain = placed(LayerType::Normal);
    assert_eq!(plain["label"].y, 100.0);
    assert_eq!(plain["c"].y, 100.0 + 20.0 + 70.0);
}

#[test]
fn sketch_strategy_follows_input_positions() {
    let layout = HierarchicLayout::new(
        vec![
            LineageNode::new("left").at(0.0, 0.0),
            LineageNode::new("right").at(400.0, 0.0),
            LineageNode::new("also-left").at(10.0, 300.0),
        ],
        edges(&[("right", "left")]),
        config(LayeringStrategy::Default, Orientation::LeftToRight),
    );
    let layers = run(&layout).layers.unwrap();
    assert_eq!(layers.layer_of("left"), Some(0));
    assert_eq!(layers.layer_of("also-left"), Some(0));
    assert_eq!(layers.layer_of("right"), Some(1));
    assert_eq!(layers.reversed_edges, vec!["e0"]);
}

#[test]
fn crossing_pair_is_untangled() {
    // a1 -> b2 and a2 -> b1 cross in input order
    let layout = HierarchicLayout::new(
        nodes(&["a1", "a2", "b1", "b2"]),
        edges(&[("a1", "b2"), ("a2", "b1")]),
        config(LayeringStrategy::Topological, Orientation::TopToBottom),
    );
    let result = run(&layout);
    assert_eq!(result.crossings, Some(0));
    let history = result.sequence.unwrap().crossing_history;
    assert!(history.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn repeated_runs_are_identical() {
    let pairs = [
        ("a", "d"),
        ("b", "d"),
        ("c", "e"),
        ("a", "e"),
        ("d", "f"),
        ("e", "f"),
        ("f", "a"),
    ];
    for randomize in [false, true] {
        let mut cfg = config(LayeringStrategy::Weighted, Orientation::LeftToRight);
        cfg.sequencing.randomize = randomize;
        let layout = HierarchicLayout::new(nodes(&["a", "b", "c", "d", "e", "f"]), edges(&pairs), cfg);
        assert_eq!(run(&layout), run(&layout));
    }
}

#[test]
fn pinned_node_keeps_its_position() {
    let layout = HierarchicLayout::new(
        vec![
            LineageNode::new("src"),
            LineageNode::new("pin").at(640.0, 480.0).pinned(),
            LineageNode::new("sink"),
        ],
        edges(&[("src", "pin"), ("pin", "sink")]),
        config(LayeringStrategy::Topological, Orientation::LeftToRight),
    );
    let result = run(&layout);
    assert_eq!(result.positions["pin"], Point::new(640.0, 480.0));
    assert!(result.positions["src"].x < 640.0);
    assert!(result.positions["sink"].x > 640.0);
}

#[test]
fn group_nodes_keep_their_position() {
    let layout = HierarchicLayout::new(
        vec![
            LineageNode::new("group").at(-5.0, -5.0).as_group(),
            LineageNode::new("a"),
            LineageNode::new("b"),
        ],
        edges(&[("a", "b"), ("group", "a")]),
        config(LayeringStrategy::Topological, Orientation::LeftToRight),
    );
    let result = run(&layout);
    assert_eq!(result.positions["group"], Point::new(-5.0, -5.0));
    assert_eq!(result.layers.unwrap().layer_of("group"), None);
}

#[test]
fn spread_separates_components_on_the_cross_axis() {
    let mut layout = HierarchicLayout::new(
        nodes(&["a", "b", "x", "y"]),
        edges(&[("a", "b"), ("x", "y")]),
        config(LayeringStrategy::Topological, Orientation::LeftToRight),
    );
    let compact = run(&layout);
    assert_eq!(compact.positions["a"].x, compact.positions["x"].x);

    layout.set_arrangement_policy("SPREAD").unwrap();
    let spread = run(&layout);
    let (a, x) = (spread.positions["a"], spread.positions["x"]);
    assert_eq!(a.x, x.x);
    assert!((a.y - x.y).abs() >= 30.0 + 50.0);
    assert_eq!(spread.positions["a"].y, spread.positions["b"].y);
}

#[test]
fn self_loops_and_parallel_edges_do_not_disturb_layers() {
    let layout = HierarchicLayout::new(
        nodes(&["a", "b"]),
        vec![
            LineageEdge::new("ab", "a", "b"),
            LineageEdge::new("ab-again", "a", "b"),
            LineageEdge::new("aa", "a", "a"),
        ],
        config(LayeringStrategy::Weighted, Orientation::LeftToRight),
    );
    let layers = run(&layout).layers.unwrap();
    assert_eq!(layers.layer_count, 2);
    assert!(layers.reversed_edges.is_empty());
}

#[test]
fn missing_endpoints_are_skipped() {
    let layout = HierarchicLayout::new(
        nodes(&["a", "b"]),
        edges(&[("a", "b"), ("a", "ghost")]),
        config(LayeringStrategy::Bfs, Orientation::LeftToRight),
    );
    let result = run(&layout);
    assert_eq!(result.positions.len(), 2);
    assert_eq!(result.layers.unwrap().layer_count, 2);
}

struct Shift(f64);

impl LayoutStage for Shift {
    fn name(&self) -> &str {
        "shift"
    }

    fn apply(&self, ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        let mut ctx = next.run(ctx)?;
        for p in ctx.positions.values_mut() {
            p.x += self.0;
        }
        Ok(ctx)
    }
}

struct CancelInside;

impl LayoutStage for CancelInside {
    fn name(&self) -> &str {
        "cancel"
    }

    fn apply(&self, ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        ctx.cancellation_token().cancel();
        next.run(ctx)
    }
}

#[test]
fn user_stages_post_process_the_result() {
    let mut layout = HierarchicLayout::new(
        nodes(&["1", "2"]),
        edges(&[("1", "2")]),
        config(LayeringStrategy::Topological, Orientation::LeftToRight),
    );
    layout.append_stage(Shift(1000.0));
    let result = run(&layout);
    assert_eq!(result.positions["1"].x, 1000.0);

    layout.disable_all_stages();
    assert_eq!(run(&layout).positions["1"].x, 0.0);
    assert!(!layout.is_stage_enabled(BuiltinStage::SelfLoops));
}

#[test]
fn cancelling_mid_run_reports_cancelled() {
    let mut layout = HierarchicLayout::new(
        nodes(&["1", "2"]),
        edges(&[("1", "2")]),
        LayoutConfig::default(),
    );
    layout.prepend_stage(CancelInside);
    assert_eq!(layout.execute_layout().unwrap(), LayoutOutcome::Cancelled);
}

#[test]
fn every_preset_lays_out_a_cyclic_graph() {
    for name in LayoutConfig::list_builtins() {
        let config = LayoutConfig::from_builtin(name).unwrap();
        let layout = HierarchicLayout::new(
            nodes(&["a", "b", "c", "d"]),
            edges(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]),
            config,
        );
        let result = run(&layout);
        assert_eq!(result.positions.len(), 4, "{name}");
        assert!(result.positions.values().all(|p| p.x.is_finite() && p.y.is_finite()));
    }
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("lineage-layout-{}-{name}", std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn config_files_load_by_extension() {
    let toml = temp_file("cfg.toml", "layoutOrientation = \"TB\"\nminimumLayerDistance = 5.0\n");
    let yaml = temp_file("cfg.yaml", "layeringStrategy: BFS\nsequencing:\n  randomize: true\n");
    let guess = temp_file("cfg.conf", "weightHeuristic: MEDIAN\n");
    let broken = temp_file("broken.toml", "layoutOrientation = \"UP\"\n");

    let config = cli::load_config_file(&toml).unwrap();
    assert_eq!(config.layout_orientation, Orientation::TopToBottom);
    assert_eq!(config.minimum_layer_distance, 5.0);

    let config = cli::load_config_file(&yaml).unwrap();
    assert_eq!(config.layering_strategy, LayeringStrategy::Bfs);
    assert!(config.sequencing.randomize);

    let config = cli::load_config_file(&guess).unwrap();
    assert_eq!(config.weight_heuristic.as_str(), "MEDIAN");

    assert!(cli::load_config_file(&broken).is_err());

    for path in [toml, yaml, guess, broken] {
        let _ = std::fs::remove_file(path);
    }
}
