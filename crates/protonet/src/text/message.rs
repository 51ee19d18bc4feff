//! Schema-less message tree for protobuf text.

use serde::{Deserialize, Serialize};

/// A scalar or nested value of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Decoded string literal.
    String(String),
    /// Numeric literal, verbatim as written.
    Number(String),
    /// Enum value or boolean (`TRAIN`, `LMDB`, `true`).
    Ident(String),
    /// Nested message.
    Message(Message),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Value::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Value::Message(_))
    }

    /// Name of the value kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Ident(_) => "identifier",
            Value::Message(_) => "message",
        }
    }
}

/// A named field occurrence. Repeated fields appear once per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// An ordered list of fields, as written in the source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push(Field::new(name, value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Last occurrence of a field (singular fields: last one wins).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// All occurrences of a repeated field, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_message(&self, name: &str) -> Option<&Message> {
        self.get(name).and_then(Value::as_message)
    }

    pub fn get_message_mut(&mut self, name: &str) -> Option<&mut Message> {
        self.fields
            .iter_mut()
            .rev()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_message_mut())
    }

    /// Set `name` inside the nested message `block`, appending the block
    /// if there is none.
    pub fn set_nested(&mut self, block: &str, name: &str, value: Value) {
        match self.get_message_mut(block) {
            Some(nested) => nested.set(name, value),
            None => {
                let mut nested = Message::new();
                nested.push(name, value);
                self.push(block, Value::Message(nested));
            }
        }
    }

    /// Set a singular field, replacing every existing occurrence in place of
    /// the first one, or appending it.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter().position(|f| f.name == name) {
            Some(first) => {
                self.fields[first].value = value;
                let mut index = 0;
                self.fields.retain(|f| {
                    let keep = index <= first || f.name != name;
                    index += 1;
                    keep
                });
            }
            None => self.push(name, value),
        }
    }

    /// Remove every occurrence of a field, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        before - self.fields.len()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for Message {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<Field> for Message {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
