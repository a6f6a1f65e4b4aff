//! Mutable document overlay

use serde_json::{Map, Value};

use super::{decode, encode, CodecError, CodecResult};

/// An editable dictionary owned by the mutation overlay until commit.
///
/// Edits mark the document changed; commit re-encodes only changed
/// documents.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableDocument {
    fields: Map<String, Value>,
    changed: bool,
}

impl MutableDocument {
    /// Creates an editable copy of a dictionary value.
    pub fn from_value(value: Value) -> CodecResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                changed: false,
            }),
            _ => Err(CodecError::NotADictionary),
        }
    }

    /// Decodes `bytes` into an editable dictionary.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        Self::from_value(decode(bytes)?)
    }

    /// Reads a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
        self.changed = true;
    }

    /// Removes a field. Returns the old value if there was one.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.fields.remove(key);
        if old.is_some() {
            self.changed = true;
        }
        old
    }

    /// Mutable access to a field; marks the document changed.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let field = self.fields.get_mut(key);
        if field.is_some() {
            self.changed = true;
        }
        field
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the dictionary has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any edit was made since the overlay was created.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Returns the document as a plain value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Re-encodes the document.
    pub fn encode(&self) -> Vec<u8> {
        // Serializing a Map directly avoids cloning it into a Value.
        serde_json::to_vec(&self.fields).unwrap_or_else(|_| encode(&self.to_value()))
    }
}
