//! Type-checked property storage keyed by registered keys.

use std::collections::BTreeMap;
use std::fmt;

use super::keys::{KeyInfo, PropertyType, PropertyValue, TypedKey, ValueType};

/// Error type for property bag access
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyError {
    TypeMismatch {
        key: String,
        expected: ValueType,
        actual: ValueType,
    },
    MissingKey {
        key: String,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::TypeMismatch {
                key,
                expected,
                actual,
            } => write!(f, "Key '{}' expects {}, got {}", key, expected, actual),
            PropertyError::MissingKey { key } => write!(f, "Missing required key '{}'", key),
        }
    }
}

impl std::error::Error for PropertyError {}

/// A key-indexed store of typed values.
///
/// Entries are indexed by key id. Every write checks the value's runtime type
/// against the key's declared type; there is no coercion between types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    values: BTreeMap<u32, (KeyInfo, PropertyValue)>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: PropertyType>(&mut self, key: &TypedKey<T>, value: T) -> Result<(), PropertyError> {
        self.set_value(key.info(), value.into_value())
    }

    /// Store an untyped value, checking it against the key's declared type.
    pub fn set_value(&mut self, key: &KeyInfo, value: PropertyValue) -> Result<(), PropertyError> {
        let actual = value.value_type();
        if actual != key.value_type {
            return Err(PropertyError::TypeMismatch {
                key: key.name.clone(),
                expected: key.value_type,
                actual,
            });
        }
        self.values.insert(key.id, (key.clone(), value));
        Ok(())
    }

    /// Stored value, or `default` when absent.
    pub fn get<T: PropertyType>(&self, key: &TypedKey<T>, default: T) -> T {
        self.values
            .get(&key.id())
            .and_then(|(_, value)| T::from_value(value))
            .unwrap_or(default)
    }

    pub fn get_value(&self, key: &KeyInfo) -> Option<&PropertyValue> {
        self.values.get(&key.id).map(|(_, value)| value)
    }

    /// Stored value, failing with `MissingKey` when absent.
    pub fn require<T: PropertyType>(&self, key: &TypedKey<T>) -> Result<T, PropertyError> {
        self.values
            .get(&key.id())
            .and_then(|(_, value)| T::from_value(value))
            .ok_or_else(|| PropertyError::MissingKey {
                key: key.name().to_string(),
            })
    }

    pub fn has(&self, key: &KeyInfo) -> bool {
        self.values.contains_key(&key.id)
    }

    pub fn remove(&mut self, key: &KeyInfo) {
        self.values.remove(&key.id);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name-keyed copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, PropertyValue> {
        self.values
            .values()
            .map(|(key, value)| (key.name.clone(), value.clone()))
            .collect()
    }
}
