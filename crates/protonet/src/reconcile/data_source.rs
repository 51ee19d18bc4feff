//! Pointing a phase's data layer at a database, creating or replacing it as
//! needed.

use crate::error::{ForceReason, NetworkError, Result};
use crate::model::{DATA_LAYER_TYPE, Layer, NetDocument, Phase};
use crate::projection::{assign_phase, layer_in_phase};

/// Name given to synthesized data layers.
pub const DATA_LAYER_NAME: &str = "data";

/// What a data-source change did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The existing layer at `index` matched; only its source changed.
    Updated { index: usize },
    /// No candidate existed; a new layer was inserted at the front.
    Created,
    /// The candidates at `removed` (original indices) were deleted and a new
    /// layer was inserted at the front.
    Replaced { removed: Vec<usize> },
}

/// Set `data_param.source` of the data layer for `phase` (train or val).
///
/// A single `Data` layer whose tops equal `tops` is updated in place. Any
/// other situation with existing candidates (another data type, different
/// tops, several layers) deletes them and inserts a fresh layer at the front,
/// which requires `force`.
pub fn reconcile_data_source<S: AsRef<str>>(
    doc: &mut NetDocument,
    phase: Phase,
    tops: &[S],
    source: &str,
    force: bool,
) -> Result<Reconciliation> {
    if !matches!(phase, Phase::Train | Phase::Val) {
        return Err(NetworkError::InvalidArgument(format!(
            "data sources can only be set for train or val, not {}",
            phase
        )));
    }

    let tops: Vec<String> = tops.iter().map(|t| t.as_ref().to_string()).collect();

    let candidates: Vec<usize> = doc
        .layers
        .iter()
        .enumerate()
        .filter(|(_, layer)| layer.is_data_like() && layer_in_phase(layer, phase))
        .map(|(index, _)| index)
        .collect();

    match candidates.len() {
        0 => {}
        1 => {
            let index = candidates[0];
            match shape_conflict(&doc.layers[index], &tops) {
                None => {
                    doc.layers[index].set_data_source(source);
                    log::debug!(
                        "{} data layer \"{}\" now reads {}",
                        phase,
                        doc.layers[index].name,
                        source
                    );
                    return Ok(Reconciliation::Updated { index });
                }
                Some(reason) => require_force(reason, force)?,
            }
        }
        count => require_force(ForceReason::LayerCount { count }, force)?,
    }
    let removed = candidates;

    // Build the replacement before touching the document.
    let mut layer = Layer::new(DATA_LAYER_NAME, DATA_LAYER_TYPE);
    layer.top = tops;
    assign_phase(&mut layer, Some(phase))?;
    layer.set_data_source(source);

    // Candidates are ascending; delete from the back so indices stay valid.
    for &index in removed.iter().rev() {
        let old = doc.layers.remove(index);
        log::warn!("forced: removed {} data layer \"{}\" ({})", phase, old.name, old.layer_type);
    }
    doc.layers.insert(0, layer);

    if removed.is_empty() {
        log::debug!("created {} data layer reading {}", phase, source);
        Ok(Reconciliation::Created)
    } else {
        Ok(Reconciliation::Replaced { removed })
    }
}

/// Why the existing layer cannot be reused as-is, if it cannot.
fn shape_conflict(layer: &Layer, tops: &[String]) -> Option<ForceReason> {
    if !layer.is_data() {
        return Some(ForceReason::LayerType {
            found: layer.layer_type.clone(),
        });
    }
    if layer.top.len() != tops.len() {
        return Some(ForceReason::TopCount {
            expected: tops.len(),
            found: layer.top.len(),
        });
    }
    layer
        .top
        .iter()
        .zip(tops)
        .position(|(found, expected)| found != expected)
        .map(|index| ForceReason::TopName {
            index,
            expected: tops[index].clone(),
            found: layer.top[index].clone(),
        })
}

fn require_force(reason: ForceReason, force: bool) -> Result<()> {
    if force {
        log::debug!("forcing data layer replacement: {}", reason);
        Ok(())
    } else {
        Err(NetworkError::RequiresForce(reason))
    }
}
