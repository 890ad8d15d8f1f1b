pub mod cli;
pub mod config;
pub mod error;
pub mod hierarchic;
pub mod random;

pub use config::LayoutConfig;
pub use error::LayoutError;
pub use hierarchic::{HierarchicLayout, LayoutOutcome, LayoutResult, LineageEdge, LineageNode, Point};
