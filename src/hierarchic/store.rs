//! Typed store for artifacts passed between pipeline stages.
//!
//! Each key is a zero-sized type naming one slot; the slot's value type is
//! fixed by the key, so a read can only ever yield what was written.

use super::layerer::LayerAssignment;
use super::sequencer::SequenceAssignment;
use super::traversal::TraversalResult;
use crate::config::ArrangementPolicy;

#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    layer_index: Option<LayerAssignment>,
    sequence_index: Option<SequenceAssignment>,
    arrangement_policy: Option<ArrangementPolicy>,
    traversal: Option<TraversalResult>,
    crossings: Option<usize>,
}

/// A named slot in the [`ArtifactStore`].
pub trait ArtifactKey {
    type Value;
    const NAME: &'static str;

    fn slot(store: &ArtifactStore) -> &Option<Self::Value>;
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value>;
}

/// Layer map written by the core layout
pub struct LayerIndex;
/// Within-layer order written by the sequencer
pub struct SequenceIndex;
/// Component arrangement read by the arrangement stage
pub struct ArrangementPolicyKey;
/// Traversal used to seed layer order
pub struct Traversal;
/// Crossing estimate of the final order
pub struct Crossings;

impl ArtifactKey for LayerIndex {
    type Value = LayerAssignment;
    const NAME: &'static str = "LAYER_INDEX";

    fn slot(store: &ArtifactStore) -> &Option<Self::Value> {
        &store.layer_index
    }
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value> {
        &mut store.layer_index
    }
}

impl ArtifactKey for SequenceIndex {
    type Value = SequenceAssignment;
    const NAME: &'static str = "SEQUENCE_INDEX";

    fn slot(store: &ArtifactStore) -> &Option<Self::Value> {
        &store.sequence_index
    }
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value> {
        &mut store.sequence_index
    }
}

impl ArtifactKey for ArrangementPolicyKey {
    type Value = ArrangementPolicy;
    const NAME: &'static str = "ARRANGEMENT_POLICY";

    fn slot(store: &ArtifactStore) -> &Option<Self::Value> {
        &store.arrangement_policy
    }
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value> {
        &mut store.arrangement_policy
    }
}

impl ArtifactKey for Traversal {
    type Value = TraversalResult;
    const NAME: &'static str = "TRAVERSAL";

    fn slot(store: &ArtifactStore) -> &Option<Self::Value> {
        &store.traversal
    }
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value> {
        &mut store.traversal
    }
}

impl ArtifactKey for Crossings {
    type Value = usize;
    const NAME: &'static str = "CROSSINGS";

    fn slot(store: &ArtifactStore) -> &Option<Self::Value> {
        &store.crossings
    }
    fn slot_mut(store: &mut ArtifactStore) -> &mut Option<Self::Value> {
        &mut store.crossings
    }
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<K: ArtifactKey>(&self) -> Option<&K::Value> {
        K::slot(self).as_ref()
    }

    pub fn set<K: ArtifactKey>(&mut self, value: K::Value) {
        tracing::trace!(key = K::NAME, "artifact stored");
        *K::slot_mut(self) = Some(value);
    }

    pub fn take<K: ArtifactKey>(&mut self) -> Option<K::Value> {
        K::slot_mut(self).take()
    }

    pub fn contains<K: ArtifactKey>(&self) -> bool {
        K::slot(self).is_some()
    }

    /// Names of the slots currently filled.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.contains::<LayerIndex>() {
            keys.push(LayerIndex::NAME);
        }
        if self.contains::<SequenceIndex>() {
            keys.push(SequenceIndex::NAME);
        }
        if self.contains::<ArrangementPolicyKey>() {
            keys.push(ArrangementPolicyKey::NAME);
        }
        if self.contains::<Traversal>() {
            keys.push(Traversal::NAME);
        }
        if self.contains::<Crossings>() {
            keys.push(Crossings::NAME);
        }
        keys
    }
}
