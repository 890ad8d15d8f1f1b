use serde::{Deserialize, Serialize};

/// A 2D coordinate. Node positions are the top-left corner of the node box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Role of the layer a node sits in. Anything other than `Normal` marks a
/// label or connector layer, which gets its own minimum spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    #[default]
    Normal,
    Label,
    LowerGroupConnectorNodes,
    UpperGroupConnectorNodes,
    SourceGroupNodes,
    TargetGroupNodes,
}

/// Optional per-node layout hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Pinned nodes keep their input position
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub layer_type: LayerType,
    /// Group nodes are laid out around, not inside, the hierarchy
    #[serde(default)]
    pub group: bool,
}

/// A node in a lineage graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub id: String,
    #[serde(default)]
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub data: NodeData,
}

impl LineageNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: Point::default(),
            width: None,
            height: None,
            data: NodeData::default(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.data.fixed = true;
        self
    }

    pub fn with_layer_type(mut self, layer_type: LayerType) -> Self {
        self.data.layer_type = layer_type;
        self
    }

    pub fn as_group(mut self) -> Self {
        self.data.group = true;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.data.fixed
    }

    /// Width, falling back to `default` when the node was never measured.
    pub fn width_or(&self, default: f64) -> f64 {
        self.width.unwrap_or(default)
    }

    pub fn height_or(&self, default: f64) -> f64 {
        self.height.unwrap_or(default)
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl LineageEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Input document accepted by the binaries: nodes, edges and an optional
/// inline config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<LineageNode>,
    #[serde(default)]
    pub edges: Vec<LineageEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<crate::config::LayoutConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_json_uses_camel_case_hints() {
        let json = r#"{"id":"n1","position":{"x":4,"y":8},"width":120,
            "data":{"fixed":true,"layerType":"LOWER_GROUP_CONNECTOR_NODES"}}"#;
        let node: LineageNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.position, Point::new(4.0, 8.0));
        assert_eq!(node.width, Some(120.0));
        assert_eq!(node.height, None);
        assert!(node.is_fixed());
        assert_eq!(node.data.layer_type, LayerType::LowerGroupConnectorNodes);
    }

    #[test]
    fn missing_data_defaults_to_normal_unpinned() {
        let node: LineageNode = serde_json::from_str(r#"{"id":"a"}"#).unwrap();
        assert_eq!(node.data, NodeData::default());
        assert_eq!(node.height_or(30.0), 30.0);
    }
}
