//! The hierarchic core layout and the facade that runs it through the
//! pipeline.

use super::cycles::{EdgeWeightProvider, UnitWeights};
use super::graph::{ConnectedElements, LayoutGraph};
use super::layerer::{LayerAssignment, LayerNodeMap, layerer_for};
use super::pipeline::{CoreLayout, LayoutContext, LayoutStage, PipelineBuilder};
use super::placer::NodePlacer;
use super::sequencer::{SequenceAssignment, Sequencer};
use super::stages::{ComponentArrangementStage, HideGroupsStage, ParallelEdgeStage, SelfLoopStage};
use super::store::{ArrangementPolicyKey, Crossings, LayerIndex, SequenceIndex, Traversal};
use super::traversal::{CancellationToken, TraversalKind, TraversalResult};
use super::types::{GraphDocument, LineageEdge, LineageNode, Point};
use crate::config::{LayeringStrategy, LayoutConfig};
use crate::error::LayoutError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Walk used to seed layer order.
pub fn traversal_kind(config: &LayoutConfig) -> TraversalKind {
    if config.layering_strategy == LayeringStrategy::Bfs || config.layout_orientation.is_horizontal() {
        TraversalKind::BreadthFirst
    } else {
        TraversalKind::DepthFirst
    }
}

/// Start order for sequencing: fewer traversal parents first, stable.
pub fn initial_order(graph: &LayoutGraph, map: &LayerNodeMap, traversal: &TraversalResult) -> Vec<Vec<usize>> {
    let parents = traversal.parent_counts();
    map.layers
        .iter()
        .map(|layer| {
            let mut layer = layer.clone();
            layer.sort_by_key(|&n| parents.get(graph.node(n).id.as_str()).copied().unwrap_or(0));
            layer
        })
        .collect()
}

/// Flips positions along the layer axis: `p' = -(p + extent)`. Applying it
/// twice restores the input.
fn mirror(point: Point, width: f64, height: f64, horizontal: bool) -> Point {
    if horizontal {
        Point::new(-(point.x + width), point.y)
    } else {
        Point::new(point.x, -(point.y + height))
    }
}

/// Traversal, layering, sequencing and placement of one graph
#[derive(Debug, Clone)]
pub struct HierarchicCore {
    edge_weights: Option<HashMap<String, f64>>,
    place: bool,
}

impl HierarchicCore {
    pub fn new(edge_weights: Option<HashMap<String, f64>>) -> Self {
        Self {
            edge_weights,
            place: true,
        }
    }

    /// Stops after sequencing; no positions are produced.
    pub fn without_placement(mut self) -> Self {
        self.place = false;
        self
    }

    fn mirror_graph(graph: &mut LayoutGraph, config: &LayoutConfig) {
        let horizontal = config.layout_orientation.is_horizontal();
        for n in 0..graph.node_count() {
            let node = graph.node_mut(n);
            let (w, h) = (node.width_or(config.min_node_size), node.height_or(config.min_node_size));
            node.position = mirror(node.position, w, h, horizontal);
        }
    }

    /// Places the sequenced layers and mirrors the graph and the result back
    /// when the orientation was mirrored.
    fn place_nodes(ctx: &mut LayoutContext, config: &LayoutConfig, layers: &[Vec<usize>], mirrored: bool) {
        let mut points = NodePlacer::new(config).place(&ctx.graph, layers);
        if mirrored {
            Self::mirror_graph(&mut ctx.graph, config);
            let horizontal = config.layout_orientation.is_horizontal();
            for (n, point) in points.iter_mut().enumerate() {
                let node = ctx.graph.node(n);
                let (w, h) = (node.width_or(config.min_node_size), node.height_or(config.min_node_size));
                *point = mirror(*point, w, h, horizontal);
            }
            if !ctx.graph.nodes().iter().any(|n| n.is_fixed()) {
                let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
                let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
                for point in &mut points {
                    point.x -= min_x;
                    point.y -= min_y;
                }
            }
        }

        for (n, point) in points.into_iter().enumerate() {
            ctx.positions.insert(ctx.graph.node(n).id.clone(), point);
        }
    }
}

impl CoreLayout for HierarchicCore {
    fn layout(&self, mut ctx: LayoutContext) -> Result<LayoutContext, LayoutError> {
        let config = ctx.config.clone();
        let cancel = ctx.cancellation_token().clone();
        ctx.store.set::<ArrangementPolicyKey>(config.arrangement_policy);
        if ctx.graph.is_empty() {
            ctx.store.set::<LayerIndex>(LayerAssignment::default());
            ctx.store.set::<SequenceIndex>(SequenceAssignment::default());
            return Ok(ctx);
        }

        let mirrored = config.layout_orientation.is_mirrored();
        if mirrored {
            Self::mirror_graph(&mut ctx.graph, &config);
        }

        let traversal = traversal_kind(&config).traverse_all(&ctx.graph, &cancel);
        ctx.check_cancelled()?;

        let unit = UnitWeights;
        let weights: &dyn EdgeWeightProvider = match &self.edge_weights {
            Some(map) => map,
            None => &unit,
        };
        let map = {
            let layerer = layerer_for(&config, &traversal, weights);
            let map = layerer.assign_layers(&mut ctx.graph, &cancel);
            tracing::debug!(
                layerer = layerer.name(),
                layers = map.layer_count(),
                reversed = map.reversed_edges.len(),
                "layers assigned"
            );
            map
        };
        ctx.check_cancelled()?;

        let initial = initial_order(&ctx.graph, &map, &traversal);
        let sequenced = Sequencer::new(
            &ctx.graph,
            &map.layer_of,
            &config.sequencing,
            config.weight_heuristic,
            &cancel,
        )
        .sequence(initial);
        ctx.check_cancelled()?;

        if self.place {
            Self::place_nodes(&mut ctx, &config, &sequenced.layers, mirrored);
        } else if mirrored {
            Self::mirror_graph(&mut ctx.graph, &config);
        }

        ctx.store.set::<LayerIndex>(map.to_assignment(&ctx.graph));
        ctx.store.set::<SequenceIndex>(sequenced.to_assignment(&ctx.graph));
        ctx.store.set::<Crossings>(sequenced.crossings);
        ctx.store.set::<Traversal>(traversal);
        Ok(ctx)
    }
}

/// Positions plus the intermediate artifacts worth reporting
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub positions: BTreeMap<String, Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerAssignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceAssignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossings: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOutcome {
    Completed(LayoutResult),
    Cancelled,
}

impl LayoutOutcome {
    pub fn completed(self) -> Option<LayoutResult> {
        match self {
            LayoutOutcome::Completed(result) => Some(result),
            LayoutOutcome::Cancelled => None,
        }
    }
}

/// Built-in stages that can be switched on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStage {
    SelfLoops,
    ParallelEdges,
    HideGroups,
    ComponentArrangement,
}

impl BuiltinStage {
    pub const ALL: [BuiltinStage; 4] = [
        BuiltinStage::SelfLoops,
        BuiltinStage::ParallelEdges,
        BuiltinStage::HideGroups,
        BuiltinStage::ComponentArrangement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinStage::SelfLoops => "self-loops",
            BuiltinStage::ParallelEdges => "parallel-edges",
            BuiltinStage::HideGroups => "hide-groups",
            BuiltinStage::ComponentArrangement => "component-arrangement",
        }
    }
}

/// Hierarchic layout of a lineage graph.
///
/// Holds the input graph and configuration between runs; every
/// [`execute_layout`](Self::execute_layout) recomputes from scratch.
pub struct HierarchicLayout {
    nodes: Vec<LineageNode>,
    edges: Vec<LineageEdge>,
    config: LayoutConfig,
    pre_stages: Vec<Arc<dyn LayoutStage>>,
    post_stages: Vec<Arc<dyn LayoutStage>>,
    enabled: [bool; 4],
    edge_weights: Option<HashMap<String, f64>>,
    cancel: CancellationToken,
}

impl Default for HierarchicLayout {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), LayoutConfig::default())
    }
}

impl HierarchicLayout {
    pub fn new(nodes: Vec<LineageNode>, edges: Vec<LineageEdge>, config: LayoutConfig) -> Self {
        Self {
            nodes,
            edges,
            config,
            pre_stages: Vec::new(),
            post_stages: Vec::new(),
            enabled: [true; 4],
            edge_weights: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses the document's inline config when it has one.
    pub fn from_document(document: GraphDocument) -> Result<Self, LayoutError> {
        let config = document.config.unwrap_or_default();
        config.validate()?;
        Ok(Self::new(document.nodes, document.edges, config))
    }

    pub fn nodes(&self) -> &[LineageNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LineageEdge] {
        &self.edges
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LayoutConfig) -> Result<(), LayoutError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_minimum_layer_distance(&mut self, value: f64) -> Result<(), LayoutError> {
        self.config.set_minimum_layer_distance(value)
    }

    pub fn set_minimum_sublayer_distance(&mut self, value: f64) -> Result<(), LayoutError> {
        self.config.set_minimum_sublayer_distance(value)
    }

    pub fn set_horizontal_spacing(&mut self, value: f64) -> Result<(), LayoutError> {
        self.config.set_horizontal_spacing(value)
    }

    pub fn set_vertical_spacing(&mut self, value: f64) -> Result<(), LayoutError> {
        self.config.set_vertical_spacing(value)
    }

    pub fn set_layout_orientation(&mut self, value: &str) -> Result<(), LayoutError> {
        self.config.set_layout_orientation(value)
    }

    pub fn set_layering_strategy(&mut self, value: &str) -> Result<(), LayoutError> {
        self.config.set_layering_strategy(value)
    }

    pub fn set_weight_heuristic(&mut self, value: &str) -> Result<(), LayoutError> {
        self.config.set_weight_heuristic(value)
    }

    pub fn set_arrangement_policy(&mut self, value: &str) -> Result<(), LayoutError> {
        self.config.set_arrangement_policy(value)
    }

    /// Per-edge-id weights for weighted cycle removal; unlisted edges weigh 1.
    pub fn set_edge_weights(&mut self, weights: HashMap<String, f64>) {
        self.edge_weights = Some(weights);
    }

    /// Returns false, leaving the graph untouched, if the id is taken.
    pub fn add_node(&mut self, node: LineageNode) -> bool {
        if self.nodes.iter().any(|n| n.id == node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, edge: LineageEdge) -> bool {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<LineageNode> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(self.nodes.remove(index))
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<LineageEdge> {
        let index = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(index))
    }

    /// Replaces the node with the same id.
    pub fn update_node(&mut self, node: LineageNode) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(slot) => {
                *slot = node;
                true
            }
            None => false,
        }
    }

    pub fn update_edge(&mut self, edge: LineageEdge) -> bool {
        match self.edges.iter_mut().find(|e| e.id == edge.id) {
            Some(slot) => {
                *slot = edge;
                true
            }
            None => false,
        }
    }

    /// Smallest and largest node size, taking the larger side of each node.
    /// Falls back to the configured bounds for an empty graph.
    pub fn calculate_node_size_bounds(&self) -> (f64, f64) {
        let min_size = self.config.min_node_size;
        let sizes = self
            .nodes
            .iter()
            .map(|n| n.width_or(min_size).max(n.height_or(min_size)));
        let (lo, hi) = sizes.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });
        if lo.is_finite() {
            (lo, hi)
        } else {
            (self.config.min_node_size, self.config.max_node_size)
        }
    }

    pub fn find_all_connected_elements(&self, node_id: &str) -> Option<ConnectedElements> {
        LayoutGraph::new(self.nodes.clone(), &self.edges).find_all_connected_elements(node_id)
    }

    /// Adds a stage outside every other stage.
    pub fn prepend_stage(&mut self, stage: impl LayoutStage + 'static) {
        self.pre_stages.insert(0, Arc::new(stage));
    }

    /// Adds a stage just outside the core.
    pub fn append_stage(&mut self, stage: impl LayoutStage + 'static) {
        self.post_stages.push(Arc::new(stage));
    }

    /// Removes user stages with this name and disables a built-in stage with
    /// this name. Returns whether anything changed.
    pub fn remove_stage(&mut self, name: &str) -> bool {
        let before = self.pre_stages.len() + self.post_stages.len();
        self.pre_stages.retain(|s| s.name() != name);
        self.post_stages.retain(|s| s.name() != name);
        let mut changed = before != self.pre_stages.len() + self.post_stages.len();
        for (i, builtin) in BuiltinStage::ALL.iter().enumerate() {
            if builtin.name() == name && self.enabled[i] {
                self.enabled[i] = false;
                changed = true;
            }
        }
        changed
    }

    pub fn set_stage_enabled(&mut self, stage: BuiltinStage, enabled: bool) {
        if let Some(i) = BuiltinStage::ALL.iter().position(|&s| s == stage) {
            self.enabled[i] = enabled;
        }
    }

    pub fn is_stage_enabled(&self, stage: BuiltinStage) -> bool {
        BuiltinStage::ALL
            .iter()
            .position(|&s| s == stage)
            .is_some_and(|i| self.enabled[i])
    }

    /// Leaves only the core.
    pub fn disable_all_stages(&mut self) {
        self.pre_stages.clear();
        self.post_stages.clear();
        self.enabled = [false; 4];
    }

    /// Shared flag that aborts a running layout. It stays set until
    /// [`CancellationToken::reset`] is called.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stage names of the next run, outermost first.
    pub fn stage_names(&self) -> Vec<String> {
        self.pipeline(self.core())
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn pipeline(&self, core: HierarchicCore) -> super::pipeline::Pipeline {
        let mut builder = PipelineBuilder::new();
        for stage in &self.pre_stages {
            builder = builder.pre_stage(Arc::clone(stage));
        }
        if self.is_stage_enabled(BuiltinStage::SelfLoops) {
            builder = builder.pre_stage(Arc::new(SelfLoopStage));
        }
        if self.is_stage_enabled(BuiltinStage::ParallelEdges) {
            builder = builder.pre_stage(Arc::new(ParallelEdgeStage));
        }
        if self.is_stage_enabled(BuiltinStage::HideGroups) {
            builder = builder.hide_groups(Arc::new(HideGroupsStage));
        }
        if self.is_stage_enabled(BuiltinStage::ComponentArrangement) {
            builder = builder.post_stage(Arc::new(ComponentArrangementStage));
        }
        for stage in &self.post_stages {
            builder = builder.post_stage(Arc::clone(stage));
        }
        builder.build(Box::new(core))
    }

    fn core(&self) -> HierarchicCore {
        HierarchicCore::new(self.edge_weights.clone())
    }

    /// Runs the full pipeline on a fresh copy of the graph.
    pub fn execute_layout(&self) -> Result<LayoutOutcome, LayoutError> {
        self.execute(self.core())
    }

    /// Runs the pipeline up to sequencing. The result carries layers, order
    /// and crossings; node positions are not computed.
    pub fn execute_ordering(&self) -> Result<LayoutOutcome, LayoutError> {
        self.execute(self.core().without_placement())
    }

    fn execute(&self, core: HierarchicCore) -> Result<LayoutOutcome, LayoutError> {
        self.config.validate()?;
        let graph = LayoutGraph::new(self.nodes.clone(), &self.edges);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            orientation = %self.config.layout_orientation,
            strategy = %self.config.layering_strategy,
            "layout started"
        );
        let ctx = LayoutContext::new(graph, self.config.clone(), self.cancel.clone());

        let mut ctx = match self.pipeline(core).run(ctx) {
            Ok(ctx) => ctx,
            Err(LayoutError::Cancelled) => {
                tracing::debug!("layout cancelled");
                return Ok(LayoutOutcome::Cancelled);
            }
            Err(err) => return Err(err),
        };
        if self.cancel.is_cancelled() {
            return Ok(LayoutOutcome::Cancelled);
        }

        Ok(LayoutOutcome::Completed(LayoutResult {
            positions: std::mem::take(&mut ctx.positions),
            layers: ctx.store.take::<LayerIndex>(),
            sequence: ctx.store.take::<SequenceIndex>(),
            crossings: ctx.store.take::<Crossings>(),
        }))
    }
}
