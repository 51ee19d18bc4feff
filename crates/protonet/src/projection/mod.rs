//! Phase projection and phase scoping of layers.

mod projector;
mod scope;

pub use projector::{layer_in_phase, layer_in_phase_tag, project};
pub use scope::{assign_phase, parse_scope};
