//! Validation of projected networks.

mod validator;

pub use validator::{ValidationConfig, Validator, bottoms, tops};
