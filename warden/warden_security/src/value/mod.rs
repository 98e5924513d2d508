//! Property values as seen by a particular caller.
//!
//! A loaded content tree holds one [`FieldValue`] per property path. Values
//! the caller may not read are [`FieldValue::Masked`]: the original is kept
//! inside the mask so a later save can restore it, but it is never exposed
//! through the public API and serializes as `null`.

mod save;
mod wrap;

pub use save::SaveGuard;
pub use wrap::{unwrap_no_access_values, wrap_no_access_values};

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use warden_core::error::{AccessError, Result};
use warden_core::id::{ContentId, ContentTypeId};

/// A value hidden from the caller.
#[derive(Clone, PartialEq)]
pub struct Masked<T>(T);

impl<T> Masked<T> {
    pub(crate) fn new(original: T) -> Self {
        Self(original)
    }

    pub(crate) fn into_original(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked(..)")
    }
}

/// A property value together with what the caller may do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<T> {
    /// Readable and writable.
    Visible(T),
    /// Readable only.
    ReadOnly(T),
    /// Not readable. The original is retained for the save path.
    Masked(Masked<T>),
}

impl<T> FieldValue<T> {
    /// The value, unless it is masked.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Visible(value) | Self::ReadOnly(value) => Some(value),
            Self::Masked(_) => None,
        }
    }

    /// Whether the value is masked.
    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Masked(_))
    }

    /// Whether the value is read-only.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }

    /// Whether the caller may write the value.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Visible(_))
    }

    /// The value including masked originals.
    pub(crate) fn revealed(&self) -> &T {
        match self {
            Self::Visible(value) | Self::ReadOnly(value) => value,
            Self::Masked(masked) => &masked.0,
        }
    }

    /// Strip the access marker, revealing masked values.
    pub(crate) fn reveal(self) -> T {
        match self {
            Self::Visible(value) | Self::ReadOnly(value) => value,
            Self::Masked(masked) => masked.into_original(),
        }
    }
}

impl<T: Serialize> Serialize for FieldValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.get() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::Visible)
    }
}

/// Whether a JSON value carries no data.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// The properties of one content instance, keyed by XPath-like path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTree {
    /// The content, `None` for content that is not saved yet.
    pub id: Option<ContentId>,

    /// The content's type.
    pub type_id: ContentTypeId,

    properties: BTreeMap<String, FieldValue<Value>>,
}

impl ContentTree {
    /// An empty tree.
    pub fn new(type_id: ContentTypeId) -> Self {
        Self {
            id: None,
            type_id,
            properties: BTreeMap::new(),
        }
    }

    /// Set the content id.
    pub fn with_id(mut self, id: ContentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Add a visible property, builder style.
    pub fn with(mut self, path: impl Into<String>, value: Value) -> Self {
        self.insert(path, value);
        self
    }

    /// Add or replace a property as visible, regardless of its marker.
    ///
    /// Used when building trees from storage; callers editing a loaded tree
    /// go through [`set_value`](Self::set_value).
    pub fn insert(&mut self, path: impl Into<String>, value: Value) {
        self.properties.insert(path.into(), FieldValue::Visible(value));
    }

    /// The property at `path`.
    pub fn get(&self, path: &str) -> Option<&FieldValue<Value>> {
        self.properties.get(path)
    }

    /// The readable value at `path`.
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.properties.get(path).and_then(FieldValue::get)
    }

    /// Change a property.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the value was set.
    /// * `Err` - If the current value is masked or read-only.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<()> {
        self.ensure_writable(path)?;
        self.properties.insert(path.to_string(), FieldValue::Visible(value));
        Ok(())
    }

    /// Remove a property, returning its value.
    pub fn remove(&mut self, path: &str) -> Result<Option<Value>> {
        self.ensure_writable(path)?;
        Ok(self.properties.remove(path).map(FieldValue::reveal))
    }

    /// All property paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// All properties.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &FieldValue<Value>)> {
        self.properties.iter().map(|(path, value)| (path.as_str(), value))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the tree has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub(crate) fn map_values<F>(self, mut f: F) -> Self
    where
        F: FnMut(&str, FieldValue<Value>) -> FieldValue<Value>,
    {
        let properties = self
            .properties
            .into_iter()
            .map(|(path, value)| {
                let value = f(&path, value);
                (path, value)
            })
            .collect();
        Self {
            id: self.id,
            type_id: self.type_id,
            properties,
        }
    }

    fn ensure_writable(&self, path: &str) -> Result<()> {
        match self.properties.get(path) {
            Some(FieldValue::Masked(_)) => Err(AccessError::MaskedProperty(path.to_string()).into()),
            Some(FieldValue::ReadOnly(_)) => {
                Err(AccessError::ReadOnlyProperty(path.to_string()).into())
            }
            _ => Ok(()),
        }
    }
}
