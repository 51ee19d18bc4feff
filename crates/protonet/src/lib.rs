//! protonet: phase projection and validation for Caffe prototxt networks.
//!
//! One canonical network description carries the layers of every phase.
//! Layers are scoped by name (`train_*` layers never reach deploy, `deploy_*`
//! layers only reach deploy) and by `include`/`exclude` phase rules.
//!
//! # Core Operations
//!
//! - **Projection**: derive the train, val, trainval or deploy network, with
//!   scoping prefixes stripped from layer names
//! - **Data sources**: point the train/val data layer at a database,
//!   replacing mismatched layers only when forced
//! - **Validation**: every projected network has layers and every
//!   `bottom` is produced by some `top` (or is `data`/`label`)
//!
//! # Example
//!
//! ```no_run
//! use protonet::{Network, Phase};
//!
//! let mut network = Network::new();
//! network.load_file("train_val.prototxt").unwrap();
//! network
//!     .set_data_source_lmdb(Phase::Train, &["data", "label"], "/jobs/1/train_db", false)
//!     .unwrap();
//! network.validate().unwrap();
//!
//! println!("{}", network.deploy_network().unwrap());
//! ```

pub mod error;
pub mod model;
pub mod projection;
pub mod reconcile;
pub mod text;
pub mod validation;

mod network;

pub use error::{ForceReason, NetworkError, Result};
pub use model::{Layer, NetDocument, Phase, PhaseRule, PhaseTag};
pub use network::{Network, NetworkConfig, SourceInfo};
pub use reconcile::Reconciliation;
pub use text::{ParseError, ParserConfig};
pub use validation::ValidationConfig;
