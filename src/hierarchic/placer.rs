//! Coordinate assignment.
//!
//! Layers become bands along the orientation axis; nodes are stacked along
//! the cross axis in sequenced order, then pulled toward the median of their
//! neighbors in adjacent layers. Pinned nodes keep their input position and
//! anchor the bands of the layers they sit in.

use super::graph::LayoutGraph;
use super::types::{LayerType, Point};
use crate::config::LayoutConfig;

/// A layer's band on the orientation axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    offset: f64,
    thickness: f64,
}

pub struct NodePlacer<'a> {
    config: &'a LayoutConfig,
}

impl<'a> NodePlacer<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    fn horizontal(&self) -> bool {
        self.config.layout_orientation.is_horizontal()
    }

    /// Node size along the orientation axis.
    fn layer_extent(&self, graph: &LayoutGraph, node: usize) -> f64 {
        let n = graph.node(node);
        if self.horizontal() {
            n.width_or(self.config.min_node_size)
        } else {
            n.height_or(self.config.min_node_size)
        }
    }

    fn cross_extent(&self, graph: &LayoutGraph, node: usize) -> f64 {
        let n = graph.node(node);
        if self.horizontal() {
            n.height_or(self.config.min_node_size)
        } else {
            n.width_or(self.config.min_node_size)
        }
    }

    /// `(layer axis, cross axis)` coordinates of a point.
    fn split(&self, point: Point) -> (f64, f64) {
        if self.horizontal() {
            (point.x, point.y)
        } else {
            (point.y, point.x)
        }
    }

    fn join(&self, layer: f64, cross: f64) -> Point {
        if self.horizontal() {
            Point::new(layer, cross)
        } else {
            Point::new(cross, layer)
        }
    }

    fn layer_gap(&self) -> f64 {
        self.config.layer_spacing() + self.config.minimum_layer_distance
    }

    fn cross_gap(&self) -> f64 {
        self.config.cross_spacing() + self.config.minimum_layer_distance
    }

    /// Label and connector layers are at least as thick as their widest node.
    fn thickness(&self, graph: &LayoutGraph, layer: &[usize]) -> f64 {
        let widest = layer
            .iter()
            .map(|&n| self.layer_extent(graph, n))
            .fold(0.0, f64::max);
        let minimum = match layer.first() {
            Some(&first) if graph.node(first).data.layer_type != LayerType::Normal => layer
                .iter()
                .map(|&n| graph.node(n).width_or(self.config.min_node_size))
                .fold(0.0, f64::max),
            _ => self.config.minimum_sublayer_distance,
        };
        widest.max(minimum)
    }

    /// Positions by node index for every node in `layers`.
    pub fn place(&self, graph: &LayoutGraph, layers: &[Vec<usize>]) -> Vec<Point> {
        let fixed_layers: Vec<bool> = layers
            .iter()
            .map(|layer| layer.iter().any(|&n| graph.node(n).is_fixed()))
            .collect();
        let any_fixed = fixed_layers.iter().any(|&f| f);

        let bands = self.bands(graph, layers, &fixed_layers);
        let mut layer_pos = vec![0.0; graph.node_count()];
        for (l, layer) in layers.iter().enumerate() {
            for &n in layer {
                layer_pos[n] = if graph.node(n).is_fixed() {
                    self.split(graph.node(n).position).0
                } else {
                    bands[l].offset + (bands[l].thickness - self.layer_extent(graph, n)) / 2.0
                };
            }
        }

        let mut cross_pos = self.stack(graph, layers, &fixed_layers);
        for _ in 0..self.config.refinement_passes {
            self.straighten(graph, layers, &fixed_layers, &mut cross_pos);
        }

        if !any_fixed {
            let min_layer = layers.iter().flatten().map(|&n| layer_pos[n]).fold(f64::INFINITY, f64::min);
            let min_cross = layers.iter().flatten().map(|&n| cross_pos[n]).fold(f64::INFINITY, f64::min);
            if min_layer.is_finite() && min_cross.is_finite() {
                for &n in layers.iter().flatten() {
                    layer_pos[n] -= min_layer;
                    cross_pos[n] -= min_cross;
                }
            }
        }

        tracing::debug!(layers = layers.len(), fixed = any_fixed, "nodes placed");
        (0..graph.node_count())
            .map(|n| self.join(layer_pos[n], cross_pos[n]))
            .collect()
    }

    fn bands(&self, graph: &LayoutGraph, layers: &[Vec<usize>], fixed_layers: &[bool]) -> Vec<Band> {
        let gap = self.layer_gap();
        let mut bands: Vec<Band> = layers
            .iter()
            .map(|layer| Band {
                offset: 0.0,
                thickness: self.thickness(graph, layer),
            })
            .collect();

        let anchors: Vec<usize> = (0..layers.len()).filter(|&l| fixed_layers[l]).collect();
        let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
            for l in 1..bands.len() {
                bands[l].offset = bands[l - 1].offset + bands[l - 1].thickness + gap;
            }
            return bands;
        };

        for &l in &anchors {
            let (start, end) = layers[l]
                .iter()
                .filter(|&&n| graph.node(n).is_fixed())
                .map(|&n| {
                    let start = self.split(graph.node(n).position).0;
                    (start, start + self.layer_extent(graph, n))
                })
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (s, e)| (lo.min(s), hi.max(e)));
            let span = end - start;
            if span < bands[l].thickness {
                let center = (start + end) / 2.0;
                bands[l].offset = center - bands[l].thickness / 2.0;
            } else {
                bands[l].offset = start;
                bands[l].thickness = span;
            }
        }

        for pair in anchors.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let between = to - from - 1;
            if between == 0 {
                continue;
            }
            let available = bands[to].offset - (bands[from].offset + bands[from].thickness);
            let occupied: f64 = ((from + 1)..to).map(|l| bands[l].thickness).sum();
            let spread = (available - occupied) / (between + 1) as f64;
            if spread < self.config.minimum_layer_distance {
                tracing::warn!(
                    from,
                    to,
                    spread,
                    "pinned layers leave less than the minimum layer distance between them"
                );
            }
            let mut cursor = bands[from].offset + bands[from].thickness + spread;
            for l in (from + 1)..to {
                bands[l].offset = cursor;
                cursor += bands[l].thickness + spread;
            }
        }

        for l in (0..first).rev() {
            bands[l].offset = bands[l + 1].offset - gap - bands[l].thickness;
        }
        for l in (last + 1)..bands.len() {
            bands[l].offset = bands[l - 1].offset + bands[l - 1].thickness + gap;
        }
        bands
    }

    /// Sequential cross-axis placement. Free layers are centered on a common
    /// axis; layers holding pinned nodes flow their free nodes around them.
    fn stack(&self, graph: &LayoutGraph, layers: &[Vec<usize>], fixed_layers: &[bool]) -> Vec<f64> {
        let gap = self.cross_gap();
        let mut cross = vec![0.0; graph.node_count()];

        let span = |layer: &[usize]| -> f64 {
            let total: f64 = layer.iter().map(|&n| self.cross_extent(graph, n)).sum();
            total + gap * layer.len().saturating_sub(1) as f64
        };

        let pinned: Vec<(f64, f64)> = layers
            .iter()
            .flatten()
            .filter(|&&n| graph.node(n).is_fixed())
            .map(|&n| {
                let start = self.split(graph.node(n).position).1;
                (start, start + self.cross_extent(graph, n))
            })
            .collect();
        let center = if pinned.is_empty() {
            layers.iter().map(|l| span(l)).fold(0.0, f64::max) / 2.0
        } else {
            let lo = pinned.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
            let hi = pinned.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
            (lo + hi) / 2.0
        };

        for (l, layer) in layers.iter().enumerate() {
            if !fixed_layers[l] {
                let mut cursor = center - span(layer) / 2.0;
                for &n in layer {
                    cross[n] = cursor;
                    cursor += self.cross_extent(graph, n) + gap;
                }
                continue;
            }

            let occupied: Vec<(f64, f64)> = layer
                .iter()
                .filter(|&&n| graph.node(n).is_fixed())
                .map(|&n| {
                    let start = self.split(graph.node(n).position).1;
                    (start, start + self.cross_extent(graph, n))
                })
                .collect();
            let leading: f64 = layer
                .iter()
                .take_while(|&&n| !graph.node(n).is_fixed())
                .map(|&n| self.cross_extent(graph, n) + gap)
                .sum();
            let first_pinned = occupied.iter().map(|o| o.0).fold(f64::INFINITY, f64::min);
            let mut cursor = first_pinned - leading;

            for &n in layer {
                let extent = self.cross_extent(graph, n);
                if graph.node(n).is_fixed() {
                    let start = self.split(graph.node(n).position).1;
                    cross[n] = start;
                    cursor = cursor.max(start + extent + gap);
                    continue;
                }
                let mut pos = cursor;
                while let Some(&(_, end)) = occupied
                    .iter()
                    .find(|&&(s, e)| pos < e + gap && pos + extent + gap > s)
                {
                    pos = end + gap;
                }
                cross[n] = pos;
                cursor = pos + extent + gap;
            }
        }
        cross
    }

    /// One forward and one backward median pass over free layers.
    fn straighten(
        &self,
        graph: &LayoutGraph,
        layers: &[Vec<usize>],
        fixed_layers: &[bool],
        cross: &mut [f64],
    ) {
        let mut layer_of = vec![usize::MAX; graph.node_count()];
        for (l, layer) in layers.iter().enumerate() {
            for &n in layer {
                layer_of[n] = l;
            }
        }
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); graph.node_count()];
        for (_, edge) in graph.visible_edges() {
            neighbors[edge.source].push(edge.target);
            neighbors[edge.target].push(edge.source);
        }

        let forward = (1..layers.len()).map(|l| (l, l - 1));
        let backward = (0..layers.len().saturating_sub(1)).rev().map(|l| (l, l + 1));
        for (l, toward) in forward.chain(backward) {
            if fixed_layers[l] {
                continue;
            }
            for &n in &layers[l] {
                let mut centers: Vec<f64> = neighbors[n]
                    .iter()
                    .filter(|&&m| layer_of[m] == toward)
                    .map(|&m| cross[m] + self.cross_extent(graph, m) / 2.0)
                    .collect();
                if centers.is_empty() {
                    continue;
                }
                centers.sort_by(f64::total_cmp);
                let median = centers[centers.len() / 2];
                cross[n] = median - self.cross_extent(graph, n) / 2.0;
            }

            // Enforce minimum spacing
            let mut prev_end = f64::NEG_INFINITY;
            for &n in &layers[l] {
                cross[n] = cross[n].max(prev_end + self.cross_gap());
                prev_end = cross[n] + self.cross_extent(graph, n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::hierarchic::types::{LineageEdge, LineageNode};

    fn graph(nodes: Vec<LineageNode>, edges: &[(&str, &str)]) -> LayoutGraph {
        let edges: Vec<LineageEdge> = edges
            .iter()
            .enumerate()
            .map(|(i, (s, t))| LineageEdge::new(format!("e{i}"), *s, *t))
            .collect();
        LayoutGraph::new(nodes, &edges)
    }

    fn config(orientation: Orientation) -> LayoutConfig {
        LayoutConfig {
            layout_orientation: orientation,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn consecutive_layers_are_one_band_and_gap_apart() {
        let g = graph(
            vec![LineageNode::new("1").with_size(100.0, 40.0), LineageNode::new("2").with_size(100.0, 40.0)],
            &[("1", "2")],
        );
        let config = config(Orientation::LeftToRight);
        let positions = NodePlacer::new(&config).place(&g, &[vec![0], vec![1]]);

        assert_eq!(positions[0], Point::new(0.0, 0.0));
        assert_eq!(positions[1], Point::new(100.0 + 50.0 + 20.0, 0.0));
    }

    #[test]
    fn top_to_bottom_stacks_layers_on_y() {
        let g = graph(vec![LineageNode::new("a"), LineageNode::new("b"), LineageNode::new("c")], &[("a", "b"), ("a", "c")]);
        let config = LayoutConfig {
            refinement_passes: 0,
            ..config(Orientation::TopToBottom)
        };
        let positions = NodePlacer::new(&config).place(&g, &[vec![0], vec![1, 2]]);

        // layer 1 is 30 + 70 + 30 wide, layer 0 is centered over it
        assert_eq!(positions[1], Point::new(0.0, 100.0));
        assert_eq!(positions[2], Point::new(100.0, 100.0));
        assert_eq!(positions[0], Point::new(50.0, 0.0));
    }

    #[test]
    fn smaller_nodes_are_centered_in_their_band() {
        let g = graph(
            vec![
                LineageNode::new("big").with_size(80.0, 30.0),
                LineageNode::new("small").with_size(20.0, 30.0),
            ],
            &[],
        );
        let config = config(Orientation::LeftToRight);
        let positions = NodePlacer::new(&config).place(&g, &[vec![0, 1]]);
        assert_eq!(positions[1].x - positions[0].x, 30.0);
    }

    #[test]
    fn label_layers_are_as_thick_as_their_widest_node() {
        let g = graph(
            vec![
                LineageNode::new("label").with_size(90.0, 10.0).with_layer_type(LayerType::Label),
                LineageNode::new("plain").with_size(90.0, 10.0),
            ],
            &[],
        );
        let config = config(Orientation::TopToBottom);
        let placer = NodePlacer::new(&config);
        assert_eq!(placer.thickness(&g, &[0]), 90.0);
        assert_eq!(placer.thickness(&g, &[1]), 15.0);
    }

    #[test]
    fn straightening_never_overlaps_neighbors() {
        let g = graph(
            vec![LineageNode::new("a"), LineageNode::new("b"), LineageNode::new("c")],
            &[("a", "b"), ("a", "c")],
        );
        let config = config(Orientation::TopToBottom);
        let positions = NodePlacer::new(&config).place(&g, &[vec![0], vec![1, 2]]);
        assert!(positions[2].x - positions[1].x >= 30.0 + 70.0);
        assert_eq!(positions[1].y, positions[2].y);
    }

    #[test]
    fn pinned_nodes_keep_their_position_and_anchor_the_layers() {
        let g = graph(
            vec![
                LineageNode::new("a"),
                LineageNode::new("pin").at(500.0, 200.0).pinned(),
                LineageNode::new("free"),
                LineageNode::new("c"),
            ],
            &[("a", "pin"), ("a", "free"), ("pin", "c")],
        );
        let config = config(Orientation::LeftToRight);
        let positions = NodePlacer::new(&config).place(&g, &[vec![0], vec![1, 2], vec![3]]);

        assert_eq!(positions[1], Point::new(500.0, 200.0));
        assert_eq!(positions[0].x, 500.0 - 70.0 - 30.0);
        assert_eq!(positions[3].x, 500.0 + 30.0 + 70.0);
        // free node flows after the pinned one
        assert_eq!(positions[2].x, 500.0);
        assert!(positions[2].y >= 200.0 + 30.0 + 70.0);
    }

    #[test]
    fn free_layers_between_pinned_layers_are_spread_evenly() {
        let g = graph(
            vec![
                LineageNode::new("p").at(0.0, 0.0).pinned(),
                LineageNode::new("m"),
                LineageNode::new("q").at(300.0, 0.0).pinned(),
            ],
            &[("p", "m"), ("m", "q")],
        );
        let config = config(Orientation::LeftToRight);
        let positions = NodePlacer::new(&config).place(&g, &[vec![0], vec![1], vec![2]]);
        // 270 free units around a 30 wide band
        assert_eq!(positions[1].x, 30.0 + 120.0);
    }
}
