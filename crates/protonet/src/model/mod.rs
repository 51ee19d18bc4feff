//! Typed network model over the text-format tree.

mod document;
mod layer;
mod phase;

pub use document::NetDocument;
pub use layer::{DATA_LAYER_TYPE, Layer, PhaseRule};
pub use phase::{NameScope, Phase, PhaseTag};
