use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MIN_NODE_SIZE: f64 = 30.0;
const MAX_NODE_SIZE: f64 = 300.0;
const NODE_HALO: f64 = 5.0;
const NODE_SCALE_FACTOR: f64 = 1.0;
const HORIZONTAL_SPACING: f64 = 50.0;
const VERTICAL_SPACING: f64 = 50.0;
const MINIMUM_LAYER_DISTANCE: f64 = 20.0;
const MINIMUM_SUBLAYER_DISTANCE: f64 = 15.0;
const REFINEMENT_PASSES: usize = 4;

const MAX_SWEEPS: usize = 8;
const RANDOM_RESTARTS: usize = 2;
pub const DEFAULT_RANDOM_SEED: u64 = 4_023_985_827;
const NODE_FAN_BIAS: f64 = 0.1;
const EDGE_FAN_BIAS: f64 = 0.05;
const PRIORITY_BIAS: f64 = 0.01;
const FAN_PRIORITY_FACTOR: f64 = 0.1;
const SOURCE_ROLE_PRIORITY: f64 = 1.0;
const TARGET_ROLE_PRIORITY: f64 = 2.0;

const BUILTIN_PRESETS: &[(&str, &str)] = &[
    ("hierarchy", include_str!("../presets/hierarchy.toml")),
    ("lineage", include_str!("../presets/lineage.toml")),
    ("sketch", include_str!("../presets/sketch.toml")),
    ("weighted", include_str!("../presets/weighted.toml")),
];

fn normalize(value: &str) -> String {
    value.trim().to_ascii_uppercase().replace('-', "_")
}

/// Direction in which layers advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    #[serde(rename = "LR", alias = "LEFT_TO_RIGHT")]
    LeftToRight,
    #[serde(rename = "TB", alias = "TOP_TO_BOTTOM")]
    TopToBottom,
    #[serde(rename = "RL", alias = "RIGHT_TO_LEFT")]
    RightToLeft,
    #[serde(rename = "BT", alias = "BOTTOM_TO_TOP")]
    BottomToTop,
}

impl Orientation {
    /// True when layers advance along x.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::LeftToRight | Orientation::RightToLeft)
    }

    /// True when layers advance toward decreasing coordinates.
    pub fn is_mirrored(self) -> bool {
        matches!(self, Orientation::RightToLeft | Orientation::BottomToTop)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::LeftToRight => "LR",
            Orientation::TopToBottom => "TB",
            Orientation::RightToLeft => "RL",
            Orientation::BottomToTop => "BT",
        }
    }
}

impl FromStr for Orientation {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "LR" | "LEFT_TO_RIGHT" => Ok(Orientation::LeftToRight),
            "TB" | "TOP_TO_BOTTOM" => Ok(Orientation::TopToBottom),
            "RL" | "RIGHT_TO_LEFT" => Ok(Orientation::RightToLeft),
            "BT" | "BOTTOM_TO_TOP" => Ok(Orientation::BottomToTop),
            _ => Err(LayoutError::InvalidValue {
                field: "layout orientation",
                value: s.to_string(),
                expected: "LR, TB, RL, BT, LEFT_TO_RIGHT, TOP_TO_BOTTOM, RIGHT_TO_LEFT, BOTTOM_TO_TOP",
            }),
        }
    }
}

/// How nodes are assigned to layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayeringStrategy {
    /// Derive layers from the nodes' current positions
    #[default]
    Default,
    /// Longest-path ranks after depth-first back-edge reversal
    Topological,
    /// Breadth-first depth from the source nodes
    Bfs,
    /// Longest-path ranks after weighted greedy cycle removal
    Weighted,
}

impl LayeringStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            LayeringStrategy::Default => "DEFAULT",
            LayeringStrategy::Topological => "TOPOLOGICAL",
            LayeringStrategy::Bfs => "BFS",
            LayeringStrategy::Weighted => "WEIGHTED",
        }
    }
}

impl FromStr for LayeringStrategy {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DEFAULT" => Ok(LayeringStrategy::Default),
            "TOPOLOGICAL" => Ok(LayeringStrategy::Topological),
            "BFS" => Ok(LayeringStrategy::Bfs),
            "WEIGHTED" => Ok(LayeringStrategy::Weighted),
            _ => Err(LayoutError::InvalidValue {
                field: "layering strategy",
                value: s.to_string(),
                expected: "DEFAULT, TOPOLOGICAL, BFS, WEIGHTED",
            }),
        }
    }
}

/// Node weight function used by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightHeuristic {
    #[default]
    Barycenter,
    Median,
}

impl WeightHeuristic {
    pub fn as_str(self) -> &'static str {
        match self {
            WeightHeuristic::Barycenter => "BARYCENTER",
            WeightHeuristic::Median => "MEDIAN",
        }
    }
}

impl FromStr for WeightHeuristic {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "BARYCENTER" => Ok(WeightHeuristic::Barycenter),
            "MEDIAN" => Ok(WeightHeuristic::Median),
            _ => Err(LayoutError::InvalidValue {
                field: "weight heuristic",
                value: s.to_string(),
                expected: "BARYCENTER, MEDIAN",
            }),
        }
    }
}

/// Placement of disconnected components relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArrangementPolicy {
    /// Components share layers and interleave
    #[default]
    Compact,
    /// Components are placed side by side on the cross axis
    Spread,
}

impl ArrangementPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrangementPolicy::Compact => "COMPACT",
            ArrangementPolicy::Spread => "SPREAD",
        }
    }
}

impl FromStr for ArrangementPolicy {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "COMPACT" => Ok(ArrangementPolicy::Compact),
            "SPREAD" => Ok(ArrangementPolicy::Spread),
            _ => Err(LayoutError::InvalidValue {
                field: "arrangement policy",
                value: s.to_string(),
                expected: "COMPACT, SPREAD",
            }),
        }
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(Orientation, LayeringStrategy, WeightHeuristic, ArrangementPolicy);

/// Tunables for crossing minimization.
///
/// The bias and priority constants perturb node and edge weights by small
/// amounts; they have no derivation beyond working well on lineage graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerConfig {
    #[serde(default = "default_max_sweeps")]
    pub max_sweeps: usize,
    /// Swap neighbors after each sweep when that lowers local crossings
    #[serde(default = "default_true")]
    pub transpose: bool,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default = "default_random_restarts")]
    pub random_restarts: usize,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_node_fan_bias")]
    pub node_fan_bias: f64,
    #[serde(default = "default_edge_fan_bias")]
    pub edge_fan_bias: f64,
    #[serde(default = "default_priority_bias")]
    pub priority_bias: f64,
    #[serde(default = "default_fan_priority_factor")]
    pub fan_priority_factor: f64,
    #[serde(default = "default_source_role_priority")]
    pub source_role_priority: f64,
    #[serde(default = "default_target_role_priority")]
    pub target_role_priority: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_sweeps: MAX_SWEEPS,
            transpose: true,
            randomize: false,
            random_restarts: RANDOM_RESTARTS,
            random_seed: DEFAULT_RANDOM_SEED,
            node_fan_bias: NODE_FAN_BIAS,
            edge_fan_bias: EDGE_FAN_BIAS,
            priority_bias: PRIORITY_BIAS,
            fan_priority_factor: FAN_PRIORITY_FACTOR,
            source_role_priority: SOURCE_ROLE_PRIORITY,
            target_role_priority: TARGET_ROLE_PRIORITY,
        }
    }
}

/// Layout configuration.
///
/// Every field has a default, so partial TOML/YAML/JSON documents are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default = "default_min_node_size")]
    pub min_node_size: f64,
    #[serde(default = "default_max_node_size")]
    pub max_node_size: f64,
    #[serde(default = "default_node_halo")]
    pub node_halo_val: f64,
    #[serde(default = "default_node_scale_factor")]
    pub node_scale_factor: f64,
    #[serde(default = "default_horizontal_spacing")]
    pub horizontal_spacing: f64,
    #[serde(default = "default_vertical_spacing")]
    pub vertical_spacing: f64,
    #[serde(default = "default_minimum_layer_distance")]
    pub minimum_layer_distance: f64,
    #[serde(default = "default_minimum_sublayer_distance")]
    pub minimum_sublayer_distance: f64,
    #[serde(default)]
    pub layout_orientation: Orientation,
    #[serde(default)]
    pub layering_strategy: LayeringStrategy,
    #[serde(default)]
    pub weight_heuristic: WeightHeuristic,
    #[serde(default)]
    pub arrangement_policy: ArrangementPolicy,
    /// Median straightening passes run after sequential placement
    #[serde(default = "default_refinement_passes")]
    pub refinement_passes: usize,
    #[serde(default)]
    pub sequencing: SequencerConfig,
}

fn default_min_node_size() -> f64 {
    MIN_NODE_SIZE
}
fn default_max_node_size() -> f64 {
    MAX_NODE_SIZE
}
fn default_node_halo() -> f64 {
    NODE_HALO
}
fn default_node_scale_factor() -> f64 {
    NODE_SCALE_FACTOR
}
fn default_horizontal_spacing() -> f64 {
    HORIZONTAL_SPACING
}
fn default_vertical_spacing() -> f64 {
    VERTICAL_SPACING
}
fn default_minimum_layer_distance() -> f64 {
    MINIMUM_LAYER_DISTANCE
}
fn default_minimum_sublayer_distance() -> f64 {
    MINIMUM_SUBLAYER_DISTANCE
}
fn default_refinement_passes() -> usize {
    REFINEMENT_PASSES
}
fn default_max_sweeps() -> usize {
    MAX_SWEEPS
}
fn default_true() -> bool {
    true
}
fn default_random_restarts() -> usize {
    RANDOM_RESTARTS
}
fn default_random_seed() -> u64 {
    DEFAULT_RANDOM_SEED
}
fn default_node_fan_bias() -> f64 {
    NODE_FAN_BIAS
}
fn default_edge_fan_bias() -> f64 {
    EDGE_FAN_BIAS
}
fn default_priority_bias() -> f64 {
    PRIORITY_BIAS
}
fn default_fan_priority_factor() -> f64 {
    FAN_PRIORITY_FACTOR
}
fn default_source_role_priority() -> f64 {
    SOURCE_ROLE_PRIORITY
}
fn default_target_role_priority() -> f64 {
    TARGET_ROLE_PRIORITY
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_node_size: MIN_NODE_SIZE,
            max_node_size: MAX_NODE_SIZE,
            node_halo_val: NODE_HALO,
            node_scale_factor: NODE_SCALE_FACTOR,
            horizontal_spacing: HORIZONTAL_SPACING,
            vertical_spacing: VERTICAL_SPACING,
            minimum_layer_distance: MINIMUM_LAYER_DISTANCE,
            minimum_sublayer_distance: MINIMUM_SUBLAYER_DISTANCE,
            layout_orientation: Orientation::default(),
            layering_strategy: LayeringStrategy::default(),
            weight_heuristic: WeightHeuristic::default(),
            arrangement_policy: ArrangementPolicy::default(),
            refinement_passes: REFINEMENT_PASSES,
            sequencing: SequencerConfig::default(),
        }
    }
}

fn check_distance(field: &'static str, value: f64) -> Result<(), LayoutError> {
    if !value.is_finite() {
        return Err(LayoutError::NonFiniteValue { field, value });
    }
    if value < 0.0 {
        return Err(LayoutError::NegativeValue { field, value });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), LayoutError> {
    if !value.is_finite() {
        return Err(LayoutError::NonFiniteValue { field, value });
    }
    if value <= 0.0 {
        return Err(LayoutError::NonPositiveValue { field, value });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::NonFiniteValue { field, value })
    }
}

impl LayoutConfig {
    pub fn from_builtin(name: &str) -> Result<Self, LayoutError> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_PRESETS
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| LayoutError::UnknownPreset {
                name: name.to_string(),
                available: Self::list_builtins().join(", "),
            })?;
        Self::from_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_PRESETS.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self, LayoutError> {
        let config: LayoutConfig =
            toml::from_str(content).map_err(|e| LayoutError::parse("TOML", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, LayoutError> {
        let config: LayoutConfig =
            serde_yaml::from_str(content).map_err(|e| LayoutError::parse("YAML", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, LayoutError> {
        let config: LayoutConfig =
            serde_json::from_str(content).map_err(|e| LayoutError::parse("JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no layout run can honor.
    pub fn validate(&self) -> Result<(), LayoutError> {
        check_positive("minimum node size", self.min_node_size)?;
        check_positive("maximum node size", self.max_node_size)?;
        if self.min_node_size > self.max_node_size {
            return Err(LayoutError::InvalidNodeSizeBounds {
                min: self.min_node_size,
                max: self.max_node_size,
            });
        }
        check_positive("node scale factor", self.node_scale_factor)?;
        check_distance("node halo", self.node_halo_val)?;
        check_distance("horizontal spacing", self.horizontal_spacing)?;
        check_distance("vertical spacing", self.vertical_spacing)?;
        check_distance("minimum layer distance", self.minimum_layer_distance)?;
        check_distance("minimum sublayer distance", self.minimum_sublayer_distance)?;

        let seq = &self.sequencing;
        if seq.max_sweeps == 0 {
            return Err(LayoutError::NonPositiveValue {
                field: "maximum sweeps",
                value: 0.0,
            });
        }
        check_finite("node fan bias", seq.node_fan_bias)?;
        check_finite("edge fan bias", seq.edge_fan_bias)?;
        check_finite("priority bias", seq.priority_bias)?;
        check_finite("fan priority factor", seq.fan_priority_factor)?;
        check_finite("source role priority", seq.source_role_priority)?;
        check_finite("target role priority", seq.target_role_priority)?;
        Ok(())
    }

    pub fn set_minimum_layer_distance(&mut self, value: f64) -> Result<(), LayoutError> {
        check_distance("minimum layer distance", value)?;
        self.minimum_layer_distance = value;
        Ok(())
    }

    pub fn set_minimum_sublayer_distance(&mut self, value: f64) -> Result<(), LayoutError> {
        check_distance("minimum sublayer distance", value)?;
        self.minimum_sublayer_distance = value;
        Ok(())
    }

    pub fn set_horizontal_spacing(&mut self, value: f64) -> Result<(), LayoutError> {
        check_distance("horizontal spacing", value)?;
        self.horizontal_spacing = value;
        Ok(())
    }

    pub fn set_vertical_spacing(&mut self, value: f64) -> Result<(), LayoutError> {
        check_distance("vertical spacing", value)?;
        self.vertical_spacing = value;
        Ok(())
    }

    pub fn set_layout_orientation(&mut self, value: &str) -> Result<(), LayoutError> {
        self.layout_orientation = value.parse()?;
        Ok(())
    }

    pub fn set_layering_strategy(&mut self, value: &str) -> Result<(), LayoutError> {
        self.layering_strategy = value.parse()?;
        Ok(())
    }

    pub fn set_weight_heuristic(&mut self, value: &str) -> Result<(), LayoutError> {
        self.weight_heuristic = value.parse()?;
        Ok(())
    }

    pub fn set_arrangement_policy(&mut self, value: &str) -> Result<(), LayoutError> {
        self.arrangement_policy = value.parse()?;
        Ok(())
    }

    /// Spacing between consecutive layers.
    pub fn layer_spacing(&self) -> f64 {
        if self.layout_orientation.is_horizontal() {
            self.horizontal_spacing
        } else {
            self.vertical_spacing
        }
    }

    /// Spacing between neighbors within a layer.
    pub fn cross_spacing(&self) -> f64 {
        if self.layout_orientation.is_horizontal() {
            self.vertical_spacing
        } else {
            self.horizontal_spacing
        }
    }
}
