//! The root network document (`NetParameter`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::text::{Message, ParserConfig, Value};

use super::layer::{Layer, unknown_field, wrong_kind};

const NET_MESSAGE: &str = "caffe.NetParameter";

/// Net-level fields other than `name` and `layer`, kept opaque.
const NET_FIELDS: &[&str] = &[
    "input",
    "input_shape",
    "input_dim",
    "force_backward",
    "state",
    "debug_info",
    "layers",
];

/// An ordered list of layers plus net-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// `input`, `input_shape`, `state`... in source order.
    #[serde(default, skip_serializing_if = "Message::is_empty")]
    pub extra: Message,
}

impl NetDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document carrying the same net-level settings as `self`.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            layers: Vec::new(),
            extra: self.extra.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// First layer with the given (unstripped) name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Build a typed document from a parsed message, rejecting fields the
    /// schema does not know unless the config allows them.
    pub fn from_message(message: &Message, config: &ParserConfig) -> Result<Self> {
        let mut doc = NetDocument::new();

        for field in message {
            match field.name.as_str() {
                "name" => {
                    let name = field
                        .value
                        .as_str()
                        .ok_or_else(|| wrong_kind(NET_MESSAGE, "name", "string", &field.value))?;
                    doc.name = Some(name.to_string());
                }
                "layer" => {
                    let layer_message = field
                        .value
                        .as_message()
                        .ok_or_else(|| wrong_kind(NET_MESSAGE, "layer", "message", &field.value))?;
                    doc.layers.push(Layer::from_message(layer_message, config)?);
                }
                name if NET_FIELDS.contains(&name) || config.allow_unknown_fields => {
                    if name == "layers" {
                        log::warn!("ignoring legacy V1 \"layers\" block; only \"layer\" is projected");
                    }
                    doc.extra.push(name, field.value.clone());
                }
                name => return Err(unknown_field(NET_MESSAGE, name)),
            }
        }

        Ok(doc)
    }

    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        if let Some(name) = &self.name {
            message.push("name", Value::String(name.clone()));
        }
        for field in &self.extra {
            message.push(field.name.clone(), field.value.clone());
        }
        for layer in &self.layers {
            message.push("layer", Value::Message(layer.to_message()));
        }
        message
    }

    /// Render as prototxt.
    pub fn to_prototxt(&self) -> String {
        self.to_message().to_string()
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for NetDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_message(), f)
    }
}
