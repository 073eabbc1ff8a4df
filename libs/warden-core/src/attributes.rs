//! Nested key/value attribute bag carried by a [`crate::Token`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attributes attached to a token.
///
/// Values are arbitrary JSON; objects nest further attribute maps, which
/// [`get_nested_attribute`] can walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    /// Create an empty attribute bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a top-level attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Walk `keys` through nested objects. See [`get_nested_attribute`].
    #[must_use]
    pub fn get_nested<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        get_nested_attribute(self, keys)
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Attributes {
    type Error = Value;

    /// Only JSON objects become attributes; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Look up a value by walking a sequence of keys through nested objects.
///
/// Returns `None` when `keys` is empty, when any intermediate value is not a
/// JSON object, or when the final key is absent. Keys match exactly.
#[must_use]
pub fn get_nested_attribute<'a, S: AsRef<str>>(
    attributes: &'a Attributes,
    keys: &[S],
) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    let mut current = attributes.get(first.as_ref())?;
    for key in rest {
        current = current.as_object()?.get(key.as_ref())?;
    }
    Some(current)
}

/// Error returned by [`as_string_list`] when a value cannot be read as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to cast {value} to a string list")]
pub struct StringListError {
    pub value: Value,
}

/// Read a JSON value as a list of strings.
///
/// Arrays of strings, numbers and booleans are stringified element by
/// element. A bare string is split on whitespace. Everything else fails.
///
/// # Errors
///
/// Returns [`StringListError`] for `null`, objects, bare numbers or booleans,
/// and arrays that contain `null`, objects or nested arrays.
pub fn as_string_list(value: &Value) -> Result<Vec<String>, StringListError> {
    let fail = || StringListError {
        value: value.clone(),
    };
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                _ => Err(fail()),
            })
            .collect(),
        Value::String(s) => Ok(s.split_whitespace().map(str::to_owned).collect()),
        _ => Err(fail()),
    }
}
