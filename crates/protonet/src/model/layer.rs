//! Typed view of a `layer { ... }` record.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::text::{Message, ParserConfig, Value};

use super::phase::{NameScope, PhaseTag};

/// The one layer type the core treats specially.
pub const DATA_LAYER_TYPE: &str = "Data";

const LAYER_MESSAGE: &str = "caffe.LayerParameter";
const RULE_MESSAGE: &str = "caffe.NetStateRule";

/// Scalar `LayerParameter` fields other than name/type/bottom/top.
const LAYER_SCALARS: &[&str] = &["phase", "loss_weight", "propagate_down"];

/// Message-valued `LayerParameter` fields, kept opaque.
const LAYER_BLOCKS: &[&str] = &[
    "param",
    "blobs",
    "transform_param",
    "loss_param",
    "accuracy_param",
    "argmax_param",
    "batch_norm_param",
    "bias_param",
    "clip_param",
    "concat_param",
    "contrastive_loss_param",
    "convolution_param",
    "crop_param",
    "data_param",
    "dropout_param",
    "dummy_data_param",
    "eltwise_param",
    "elu_param",
    "embed_param",
    "exp_param",
    "flatten_param",
    "hdf5_data_param",
    "hdf5_output_param",
    "hinge_loss_param",
    "image_data_param",
    "infogain_loss_param",
    "inner_product_param",
    "input_param",
    "log_param",
    "lrn_param",
    "memory_data_param",
    "mvn_param",
    "parameter_param",
    "pooling_param",
    "power_param",
    "prelu_param",
    "python_param",
    "recurrent_param",
    "reduction_param",
    "relu_param",
    "reshape_param",
    "scale_param",
    "sigmoid_param",
    "softmax_param",
    "spp_param",
    "slice_param",
    "swish_param",
    "tanh_param",
    "threshold_param",
    "tile_param",
    "window_data_param",
];

const RULE_FIELDS: &[&str] = &["min_level", "max_level", "stage", "not_stage"];

pub(crate) fn unknown_field(message_type: &str, field: &str) -> NetworkError {
    NetworkError::Validation(format!(
        "Message type \"{}\" has no field named \"{}\"",
        message_type, field
    ))
}

pub(crate) fn wrong_kind(message_type: &str, field: &str, expected: &str, found: &Value) -> NetworkError {
    NetworkError::Validation(format!(
        "{}.{}: expected {}, found {}",
        message_type,
        field,
        expected,
        found.kind()
    ))
}

/// An `include` or `exclude` rule (`NetStateRule`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRule {
    /// Explicit phase, if the rule sets one.
    pub phase: Option<PhaseTag>,
    /// Level and stage conditions, kept verbatim.
    #[serde(default, skip_serializing_if = "Message::is_empty")]
    pub extra: Message,
}

impl PhaseRule {
    pub fn new(phase: PhaseTag) -> Self {
        Self {
            phase: Some(phase),
            extra: Message::new(),
        }
    }

    /// Phase the rule matches; an unset phase reads as the enum default.
    pub fn effective_phase(&self) -> PhaseTag {
        self.phase.unwrap_or(PhaseTag::Train)
    }

    pub fn from_message(message: &Message, config: &ParserConfig) -> Result<Self> {
        let mut rule = PhaseRule {
            phase: None,
            extra: Message::new(),
        };

        for field in message {
            match field.name.as_str() {
                "phase" => {
                    let (text, tag) = match &field.value {
                        Value::Ident(ident) => (ident, PhaseTag::from_ident(ident)),
                        Value::Number(number) => {
                            (number, number.parse().ok().and_then(PhaseTag::from_number))
                        }
                        other => return Err(wrong_kind(RULE_MESSAGE, "phase", "TRAIN or TEST", other)),
                    };
                    let tag = tag.ok_or_else(|| {
                        NetworkError::Validation(format!(
                            "Unknown enumeration value of \"{}\" for field \"phase\"",
                            text
                        ))
                    })?;
                    rule.phase = Some(tag);
                }
                name if RULE_FIELDS.contains(&name) || config.allow_unknown_fields => {
                    rule.extra.push(name, field.value.clone());
                }
                name => return Err(unknown_field(RULE_MESSAGE, name)),
            }
        }

        Ok(rule)
    }

    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        if let Some(phase) = self.phase {
            message.push("phase", Value::Ident(phase.as_str().to_string()));
        }
        for field in &self.extra {
            message.push(field.name.clone(), field.value.clone());
        }
        message
    }
}

/// A single layer of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bottom: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<PhaseRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<PhaseRule>,
    /// Every other field (parameter blocks, loss weights...) in source order.
    #[serde(default, skip_serializing_if = "Message::is_empty")]
    pub params: Message,
}

impl Layer {
    pub fn new(name: impl Into<String>, layer_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_type: layer_type.into(),
            bottom: Vec::new(),
            top: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            params: Message::new(),
        }
    }

    pub fn with_bottom(mut self, bottom: impl Into<String>) -> Self {
        self.bottom.push(bottom.into());
        self
    }

    pub fn with_top(mut self, top: impl Into<String>) -> Self {
        self.top.push(top.into());
        self
    }

    pub fn with_include(mut self, phase: PhaseTag) -> Self {
        self.include.push(PhaseRule::new(phase));
        self
    }

    pub fn with_exclude(mut self, phase: PhaseTag) -> Self {
        self.exclude.push(PhaseRule::new(phase));
        self
    }

    /// True for the reserved `Data` type only.
    pub fn is_data(&self) -> bool {
        self.layer_type == DATA_LAYER_TYPE
    }

    /// True for any type mentioning "data" (`Data`, `ImageData`, `HDF5Data`...).
    pub fn is_data_like(&self) -> bool {
        self.layer_type.to_ascii_lowercase().contains("data")
    }

    pub fn scope(&self) -> Option<NameScope> {
        NameScope::of(&self.name)
    }

    /// Name as seen outside its phase, without a scoping prefix.
    pub fn visible_name(&self) -> &str {
        NameScope::strip(&self.name)
    }

    /// `data_param.source`, if set. Repeated `data_param` blocks merge, so
    /// the last block that sets `source` wins.
    pub fn data_source(&self) -> Option<&str> {
        self.params
            .get_all("data_param")
            .filter_map(Value::as_message)
            .filter_map(|p| p.get_str("source"))
            .last()
    }

    /// Overwrite `data_param.source`, creating the block if needed.
    pub fn set_data_source(&mut self, source: impl Into<String>) {
        self.params
            .set_nested("data_param", "source", Value::String(source.into()));
    }

    pub fn from_message(message: &Message, config: &ParserConfig) -> Result<Self> {
        let mut layer = Layer::new("", "");

        for field in message {
            let name = field.name.as_str();
            match name {
                "name" | "type" | "bottom" | "top" => {
                    let s = field
                        .value
                        .as_str()
                        .ok_or_else(|| wrong_kind(LAYER_MESSAGE, name, "string", &field.value))?
                        .to_string();
                    match name {
                        "name" => layer.name = s,
                        "type" => layer.layer_type = s,
                        "bottom" => layer.bottom.push(s),
                        _ => layer.top.push(s),
                    }
                }
                "include" | "exclude" => {
                    let rule_message = field
                        .value
                        .as_message()
                        .ok_or_else(|| wrong_kind(LAYER_MESSAGE, name, "message", &field.value))?;
                    let rule = PhaseRule::from_message(rule_message, config)?;
                    if name == "include" {
                        layer.include.push(rule);
                    } else {
                        layer.exclude.push(rule);
                    }
                }
                _ if LAYER_BLOCKS.contains(&name) => {
                    if !field.value.is_message() {
                        return Err(wrong_kind(LAYER_MESSAGE, name, "message", &field.value));
                    }
                    layer.params.push(name, field.value.clone());
                }
                _ if LAYER_SCALARS.contains(&name) => {
                    if field.value.is_message() {
                        return Err(wrong_kind(LAYER_MESSAGE, name, "scalar", &field.value));
                    }
                    layer.params.push(name, field.value.clone());
                }
                _ if config.allow_unknown_fields => {
                    layer.params.push(name, field.value.clone());
                }
                _ => return Err(unknown_field(LAYER_MESSAGE, name)),
            }
        }

        Ok(layer)
    }

    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        message.push("name", Value::String(self.name.clone()));
        message.push("type", Value::String(self.layer_type.clone()));
        for bottom in &self.bottom {
            message.push("bottom", Value::String(bottom.clone()));
        }
        for top in &self.top {
            message.push("top", Value::String(top.clone()));
        }
        for rule in &self.include {
            message.push("include", Value::Message(rule.to_message()));
        }
        for rule in &self.exclude {
            message.push("exclude", Value::Message(rule.to_message()));
        }
        for field in &self.params {
            message.push(field.name.clone(), field.value.clone());
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Parser;

    fn layer_from(text: &str) -> Result<Layer> {
        let message = Parser::new().parse(text)?;
        Layer::from_message(&message, &ParserConfig::default())
    }

    #[test]
    fn test_from_message() {
        let layer = layer_from(
            r#"
            name: "train_mnist"
            type: "Data"
            top: "data"
            top: "label"
            include { phase: TRAIN }
            data_param { source: "mnist_train_lmdb" backend: LMDB }
            "#,
        )
        .unwrap();

        assert_eq!(layer.name, "train_mnist");
        assert_eq!(layer.visible_name(), "mnist");
        assert_eq!(layer.scope(), Some(NameScope::Train));
        assert!(layer.is_data());
        assert_eq!(layer.top, vec!["data", "label"]);
        assert_eq!(layer.include, vec![PhaseRule::new(PhaseTag::Train)]);
        assert_eq!(layer.data_source(), Some("mnist_train_lmdb"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = layer_from("name: \"data\"; type: \"Data\"; not_a_param: 1").unwrap_err();
        assert!(err.to_string().contains("not_a_param"));
    }

    #[test]
    fn test_unknown_field_allowed_by_config() {
        let message = Parser::new().parse("name: \"x\" custom_param { a: 1 }").unwrap();
        let config = ParserConfig {
            allow_unknown_fields: true,
            ..ParserConfig::default()
        };
        let layer = Layer::from_message(&message, &config).unwrap();
        assert!(layer.params.contains("custom_param"));
    }

    #[test]
    fn test_block_must_be_message() {
        assert!(layer_from("data_param: 3").is_err());
        assert!(layer_from("name { a: 1 }").is_err());
    }

    #[test]
    fn test_unknown_phase_value() {
        let err = layer_from("include { phase: VALIDATE }").unwrap_err();
        assert!(err.to_string().contains("VALIDATE"));
    }

    #[test]
    fn test_numeric_phase_values() {
        let layer = layer_from("include { phase: 1 } exclude { phase: 0 }").unwrap();
        assert_eq!(layer.include, vec![PhaseRule::new(PhaseTag::Test)]);
        assert_eq!(layer.exclude, vec![PhaseRule::new(PhaseTag::Train)]);

        let err = layer_from("include { phase: 2 }").unwrap_err();
        assert!(err.to_string().contains("\"2\""));
        assert!(layer_from("include { phase: 1.5 }").is_err());
        assert!(layer_from("include { phase: \"TEST\" }").is_err());
    }

    #[test]
    fn test_data_source_merges_repeated_blocks() {
        let layer = layer_from(
            "name: 'd' type: 'Data' data_param { source: 'a' } data_param { batch_size: 64 }",
        )
        .unwrap();
        assert_eq!(layer.data_source(), Some("a"));

        let layer = layer_from("data_param { source: 'a' } data_param { source: 'b' }").unwrap();
        assert_eq!(layer.data_source(), Some("b"));
    }

    #[test]
    fn test_rule_without_phase_reads_as_train() {
        let layer = layer_from("include { stage: \"finetune\" }").unwrap();
        assert_eq!(layer.include[0].phase, None);
        assert_eq!(layer.include[0].effective_phase(), PhaseTag::Train);
    }

    #[test]
    fn test_data_like() {
        assert!(Layer::new("a", "ImageData").is_data_like());
        assert!(Layer::new("a", "HDF5Data").is_data_like());
        assert!(!Layer::new("a", "ImageData").is_data());
        assert!(!Layer::new("a", "Convolution").is_data_like());
    }

    #[test]
    fn test_set_data_source_creates_block() {
        let mut layer = Layer::new("data", "Data");
        layer.set_data_source("/jobs/1/train_db");
        assert_eq!(layer.data_source(), Some("/jobs/1/train_db"));
        layer.set_data_source("/jobs/2/train_db");
        assert_eq!(layer.params.len(), 1);
        assert_eq!(layer.data_source(), Some("/jobs/2/train_db"));
    }

    #[test]
    fn test_to_message_round_trip() {
        let layer = layer_from(
            "name: 'ip' type: 'InnerProduct' bottom: 'a' top: 'b' exclude { phase: TEST } param { lr_mult: 1 }",
        )
        .unwrap();
        let again = Layer::from_message(&layer.to_message(), &ParserConfig::default()).unwrap();
        assert_eq!(layer, again);
    }
}
