//! Built-in pipeline stages.

use super::pipeline::{LayoutContext, LayoutStage, Next};
use super::store::ArrangementPolicyKey;
use super::types::Point;
use crate::config::ArrangementPolicy;
use crate::error::LayoutError;
use std::collections::HashSet;

/// Hides the listed edges of the context graph by id.
fn set_hidden(ctx: &mut LayoutContext, ids: &[String], hidden: bool) {
    for id in ids {
        if let Some(e) = ctx.graph.edge_index_of(id) {
            ctx.graph.set_hidden(e, hidden);
        }
    }
}

/// Keeps self-loops out of the inner layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfLoopStage;

impl LayoutStage for SelfLoopStage {
    fn name(&self) -> &str {
        "self-loops"
    }

    fn apply(&self, mut ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        let loops: Vec<String> = ctx
            .graph
            .edges()
            .iter()
            .filter(|e| e.is_self_loop() && !e.hidden)
            .map(|e| e.id.clone())
            .collect();
        set_hidden(&mut ctx, &loops, true);

        let mut ctx = next.run(ctx)?;
        set_hidden(&mut ctx, &loops, false);
        Ok(ctx)
    }
}

/// Keeps only the first of several edges with the same source and target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelEdgeStage;

impl LayoutStage for ParallelEdgeStage {
    fn name(&self) -> &str {
        "parallel-edges"
    }

    fn apply(&self, mut ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        let mut seen = HashSet::new();
        let duplicates: Vec<String> = ctx
            .graph
            .visible_edges()
            .filter(|(_, e)| !seen.insert((e.source, e.target)))
            .map(|(_, e)| e.id.clone())
            .collect();
        if !duplicates.is_empty() {
            tracing::debug!(count = duplicates.len(), "hiding parallel edges");
        }
        set_hidden(&mut ctx, &duplicates, true);

        let mut ctx = next.run(ctx)?;
        set_hidden(&mut ctx, &duplicates, false);
        Ok(ctx)
    }
}

/// Lays out the graph without its group nodes. Group nodes keep their input
/// position.
#[derive(Debug, Clone, Copy, Default)]
pub struct HideGroupsStage;

impl LayoutStage for HideGroupsStage {
    fn name(&self) -> &str {
        "hide-groups"
    }

    fn apply(&self, mut ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        let groups: Vec<(String, Point)> = ctx
            .graph
            .nodes()
            .iter()
            .filter(|n| n.data.group)
            .map(|n| (n.id.clone(), n.position))
            .collect();
        if groups.is_empty() {
            return next.run(ctx);
        }

        let original = std::mem::take(&mut ctx.graph);
        ctx.graph = original.filtered(|n| !n.data.group);
        let mut ctx = next.run(ctx)?;

        let mut restored = original;
        for edge in ctx.graph.edges() {
            if let Some(e) = restored.edge_index_of(&edge.id) {
                restored.set_reversed(e, edge.reversed);
            }
        }
        ctx.graph = restored;
        ctx.positions.extend(groups);
        Ok(ctx)
    }
}

/// Places connected components side by side on the cross axis when the
/// arrangement policy asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentArrangementStage;

impl LayoutStage for ComponentArrangementStage {
    fn name(&self) -> &str {
        "component-arrangement"
    }

    fn apply(&self, ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
        let mut ctx = next.run(ctx)?;
        let policy = ctx
            .store
            .get::<ArrangementPolicyKey>()
            .copied()
            .unwrap_or_default();
        if policy == ArrangementPolicy::Compact {
            return Ok(ctx);
        }

        let horizontal = ctx.config.layout_orientation.is_horizontal();
        let min_size = ctx.config.min_node_size;
        let cross = |p: &Point| if horizontal { p.y } else { p.x };

        // (first node, start, end, member ids) per movable component
        let mut spans: Vec<(usize, f64, f64, Vec<String>)> = Vec::new();
        for component in ctx.graph.components() {
            if component.iter().any(|&n| ctx.graph.node(n).is_fixed()) {
                continue;
            }
            let mut start = f64::INFINITY;
            let mut end = f64::NEG_INFINITY;
            let mut ids = Vec::with_capacity(component.len());
            for &n in &component {
                let node = ctx.graph.node(n);
                let Some(position) = ctx.positions.get(&node.id) else {
                    continue;
                };
                let extent = if horizontal {
                    node.height_or(min_size)
                } else {
                    node.width_or(min_size)
                };
                start = start.min(cross(position));
                end = end.max(cross(position) + extent);
                ids.push(node.id.clone());
            }
            if !ids.is_empty() {
                spans.push((component[0], start, end, ids));
            }
        }
        if spans.len() < 2 {
            return Ok(ctx);
        }

        spans.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let gap = ctx.config.cross_spacing();
        let mut cursor = spans[0].1;
        for (_, start, end, ids) in &spans {
            let shift = cursor - start;
            for id in ids {
                if let Some(p) = ctx.positions.get_mut(id) {
                    if horizontal {
                        p.y += shift;
                    } else {
                        p.x += shift;
                    }
                }
            }
            cursor += end - start + gap;
        }
        tracing::debug!(components = spans.len(), "components spread");
        Ok(ctx)
    }
}
