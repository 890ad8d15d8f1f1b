//! Layered (Sugiyama-style) layout of directed graphs.
//!
//! Data flows graph → traversal → layerer (with cycle removal) → sequencer →
//! placer, wrapped by the stages of a [`pipeline::Pipeline`].

pub mod cycles;
pub mod graph;
pub mod layerer;
pub mod layout;
pub mod pipeline;
pub mod placer;
pub mod sequencer;
pub mod stages;
pub mod store;
pub mod traversal;
pub mod types;

pub use graph::{ConnectedElements, LayoutGraph};
pub use layerer::LayerAssignment;
pub use layout::{BuiltinStage, HierarchicLayout, LayoutOutcome, LayoutResult};
pub use pipeline::{CoreLayout, LayoutContext, LayoutStage, Next};
pub use sequencer::SequenceAssignment;
pub use traversal::CancellationToken;
pub use types::{GraphDocument, LayerType, LineageEdge, LineageNode, NodeData, Point};
