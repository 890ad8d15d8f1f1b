//! Stage composition around the core layout.
//!
//! A pipeline is a fixed list of stages followed by a core. Each stage gets
//! the context by value together with a [`Next`] handle for the rest of the
//! chain, so it can prepare the graph, run the inner layout and post-process
//! the result.

use super::graph::LayoutGraph;
use super::store::ArtifactStore;
use super::traversal::CancellationToken;
use super::types::Point;
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a stage may read or change during one run
#[derive(Debug, Clone)]
pub struct LayoutContext {
    pub graph: LayoutGraph,
    pub config: LayoutConfig,
    pub store: ArtifactStore,
    pub positions: BTreeMap<String, Point>,
    cancel: CancellationToken,
}

impl LayoutContext {
    pub fn new(graph: LayoutGraph, config: LayoutConfig, cancel: CancellationToken) -> Self {
        Self {
            graph,
            config,
            store: ArtifactStore::new(),
            positions: BTreeMap::new(),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn check_cancelled(&self) -> Result<(), LayoutError> {
        if self.cancel.is_cancelled() {
            Err(LayoutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A wrapper around the rest of the pipeline.
pub trait LayoutStage: Send + Sync {
    fn name(&self) -> &str;

    /// Must call `next.run` exactly once unless it fails.
    fn apply(&self, ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError>;
}

/// The innermost layout of a pipeline.
pub trait CoreLayout: Send + Sync {
    fn layout(&self, ctx: LayoutContext) -> Result<LayoutContext, LayoutError>;
}

/// Remaining stages and the core
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn LayoutStage>],
    core: &'a dyn CoreLayout,
}

impl Next<'_> {
    pub fn run(self, ctx: LayoutContext) -> Result<LayoutContext, LayoutError> {
        ctx.check_cancelled()?;
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::trace!(stage = stage.name(), "entering stage");
                stage.apply(
                    ctx,
                    Next {
                        stages: rest,
                        core: self.core,
                    },
                )
            }
            None => self.core.layout(ctx),
        }
    }
}

/// Collects stages in three groups: pre-stages, the group-hiding stage, and
/// post-stages, all outermost first.
#[derive(Default)]
pub struct PipelineBuilder {
    pre: Vec<Arc<dyn LayoutStage>>,
    hide_groups: Option<Arc<dyn LayoutStage>>,
    post: Vec<Arc<dyn LayoutStage>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre_stage(mut self, stage: Arc<dyn LayoutStage>) -> Self {
        self.pre.push(stage);
        self
    }

    pub fn hide_groups(mut self, stage: Arc<dyn LayoutStage>) -> Self {
        self.hide_groups = Some(stage);
        self
    }

    /// Later post-stages sit closer to the core, so their post-processing
    /// runs first.
    pub fn post_stage(mut self, stage: Arc<dyn LayoutStage>) -> Self {
        self.post.push(stage);
        self
    }

    pub fn build(self, core: Box<dyn CoreLayout>) -> Pipeline {
        let stages = self
            .pre
            .into_iter()
            .chain(self.hide_groups)
            .chain(self.post)
            .collect();
        Pipeline { stages, core }
    }
}

pub struct Pipeline {
    stages: Vec<Arc<dyn LayoutStage>>,
    core: Box<dyn CoreLayout>,
}

impl Pipeline {
    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: LayoutContext) -> Result<LayoutContext, LayoutError> {
        Next {
            stages: &self.stages,
            core: self.core.as_ref(),
        }
        .run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl LayoutStage for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn apply(&self, ctx: LayoutContext, next: Next<'_>) -> Result<LayoutContext, LayoutError> {
            self.log.lock().unwrap().push(format!("{} before", self.name));
            let ctx = next.run(ctx)?;
            self.log.lock().unwrap().push(format!("{} after", self.name));
            Ok(ctx)
        }
    }

    struct Core(Arc<Mutex<Vec<String>>>);

    impl CoreLayout for Core {
        fn layout(&self, ctx: LayoutContext) -> Result<LayoutContext, LayoutError> {
            self.0.lock().unwrap().push("core".to_string());
            Ok(ctx)
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn LayoutStage> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
        })
    }

    fn context() -> LayoutContext {
        LayoutContext::new(LayoutGraph::default(), LayoutConfig::default(), CancellationToken::new())
    }

    #[test]
    fn stages_wrap_the_core_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new()
            .post_stage(recorder("post0", &log))
            .pre_stage(recorder("pre0", &log))
            .hide_groups(recorder("groups", &log))
            .post_stage(recorder("post1", &log))
            .pre_stage(recorder("pre1", &log))
            .build(Box::new(Core(Arc::clone(&log))));

        assert_eq!(pipeline.stage_names(), vec!["pre0", "pre1", "groups", "post0", "post1"]);
        pipeline.run(context()).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "pre0 before",
                "pre1 before",
                "groups before",
                "post0 before",
                "post1 before",
                "core",
                "post1 after",
                "post0 after",
                "groups after",
                "pre1 after",
                "pre0 after",
            ]
        );
    }

    #[test]
    fn cancelled_token_stops_before_the_core() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new()
            .pre_stage(recorder("pre", &log))
            .build(Box::new(Core(Arc::clone(&log))));
        let ctx = context();
        ctx.cancellation_token().cancel();

        assert!(matches!(pipeline.run(ctx), Err(LayoutError::Cancelled)));
        assert!(log.lock().unwrap().is_empty());
    }
}
