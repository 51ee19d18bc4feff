//! Data-source reconciliation.

mod data_source;

pub use data_source::{DATA_LAYER_NAME, Reconciliation, reconcile_data_source};
