//! Tie-breaking helper for the nine fixed pipeline stages (spec.md §4.3,
//! §4.7): "the one contributed earlier (lower stage, then lower insertion
//! index within stage) wins".

use crate::graph::{FrameGraph, FrameId};

/// Sort `frames` into contribution order. The composer already allocates
/// frames in this order, so this is mostly useful for tests and for callers
/// that accumulate frames from more than one composer pass.
pub fn sort_by_contribution_order(frames: &mut [FrameId], graph: &FrameGraph) {
    frames.sort_by_key(|id| {
        let slot = &graph.frames[*id];
        (slot.stage, slot.insertion_index)
    });
}
