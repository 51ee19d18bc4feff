//! Projection of the full layer list onto one logical phase.

use crate::model::{Layer, NameScope, NetDocument, Phase, PhaseTag};

/// Whether the layer's `include`/`exclude` rules admit `tag`.
///
/// `include` is consulted first; `exclude` only when `include` is empty. A
/// layer with neither runs in every phase.
pub fn layer_in_phase_tag(layer: &Layer, tag: PhaseTag) -> bool {
    if !layer.include.is_empty() {
        return layer.include.iter().any(|r| r.effective_phase() == tag);
    }
    if !layer.exclude.is_empty() {
        return !layer.exclude.iter().any(|r| r.effective_phase() == tag);
    }
    true
}

/// Whether the layer belongs to the logical `phase`, combining its name
/// scope with its phase rules.
pub fn layer_in_phase(layer: &Layer, phase: Phase) -> bool {
    let scope = layer.scope();
    match phase {
        Phase::Train => {
            scope != Some(NameScope::Deploy) && layer_in_phase_tag(layer, PhaseTag::Train)
        }
        Phase::Val => scope != Some(NameScope::Deploy) && layer_in_phase_tag(layer, PhaseTag::Test),
        Phase::TrainVal => {
            layer_in_phase(layer, Phase::Train) || layer_in_phase(layer, Phase::Val)
        }
        Phase::Deploy => {
            scope != Some(NameScope::Train) && layer_in_phase_tag(layer, PhaseTag::Test)
        }
    }
}

/// Copy the layers of `doc` that belong to `phase`, in order, with scoping
/// prefixes stripped from their names. `doc` is left untouched.
pub fn project(doc: &NetDocument, phase: Phase) -> NetDocument {
    let mut projected = doc.empty_like();
    projected.layers = doc
        .layers
        .iter()
        .filter(|layer| layer_in_phase(layer, phase))
        .map(|layer| {
            let mut copy = layer.clone();
            copy.name = layer.visible_name().to_string();
            copy
        })
        .collect();

    log::debug!(
        "projected {} network: {} of {} layers",
        phase,
        projected.len(),
        doc.len()
    );
    projected
}
