//! Typed key registry for dynamic entity properties.
//!
//! A registry hands out process-unique, strongly-typed keys. Independent
//! modules register the keys they need by name; registering an existing name
//! with the same value type returns the existing key, so modules can share
//! identifiers without a compile-time schema. A conflicting type is rejected.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Mutex;

/// Declared value type of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Float,
    Bool,
    Text,
    TextList,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Text => "text",
            ValueType::TextList => "text_list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value stored under a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Int(_) => ValueType::Int,
            PropertyValue::Float(_) => ValueType::Float,
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Text(_) => ValueType::Text,
            PropertyValue::TextList(_) => ValueType::TextList,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{:?}", fl),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::TextList(l) => write!(f, "{:?}", l),
        }
    }
}

/// Rust types that can be stored in a property bag.
pub trait PropertyType: Sized {
    const VALUE_TYPE: ValueType;

    fn into_value(self) -> PropertyValue;

    fn from_value(value: &PropertyValue) -> Option<Self>;
}

impl PropertyType for i64 {
    const VALUE_TYPE: ValueType = ValueType::Int;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Int(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl PropertyType for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Float(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PropertyType for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Bool(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PropertyType for String {
    const VALUE_TYPE: ValueType = ValueType::Text;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Text(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl PropertyType for Vec<String> {
    const VALUE_TYPE: ValueType = ValueType::TextList;

    fn into_value(self) -> PropertyValue {
        PropertyValue::TextList(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::TextList(l) => Some(l.clone()),
            _ => None,
        }
    }
}

/// Untyped description of a registered key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyInfo {
    pub id: u32,
    pub name: String,
    pub value_type: ValueType,
    pub owner: String,
}

/// A registered key carrying its value type at compile time.
#[derive(Debug, PartialEq, Eq)]
pub struct TypedKey<T> {
    info: KeyInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedKey<T> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> TypedKey<T> {
    pub fn id(&self) -> u32 {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn owner(&self) -> &str {
        &self.info.owner
    }

    pub fn value_type(&self) -> ValueType {
        self.info.value_type
    }

    pub fn info(&self) -> &KeyInfo {
        &self.info
    }
}

/// Error type for key registration
#[derive(Debug, Clone, PartialEq)]
pub enum KeyError {
    InvalidArgument(String),
    KeyConflict {
        name: String,
        existing: ValueType,
        requested: ValueType,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            KeyError::KeyConflict {
                name,
                existing,
                requested,
            } => write!(
                f,
                "Key '{}' already registered with type {}, requested {}",
                name, existing, requested
            ),
        }
    }
}

impl std::error::Error for KeyError {}

/// Library-level key for an entity's display name.
pub const ENTITY_NAME: &str = "entity.name";

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u32,
    by_name: IndexMap<String, KeyInfo>,
}

impl RegistryState {
    /// Allocate the next id for a name not yet present.
    fn insert(&mut self, owner: &str, name: &str, value_type: ValueType) -> KeyInfo {
        self.next_id += 1;
        let info = KeyInfo {
            id: self.next_id,
            name: name.to_string(),
            value_type,
            owner: owner.to_string(),
        };
        self.by_name.insert(name.to_string(), info.clone());
        info
    }
}

/// Namespace of typed keys.
///
/// Ids are allocated sequentially from 1. The existence check and id
/// allocation happen under one lock, so concurrent registration of the same
/// name always yields a single key.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    state: Mutex<RegistryState>,
}

impl KeyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the library keys (`entity.name`).
    pub fn standard() -> Self {
        let mut state = RegistryState::default();
        state.insert("dynamiclib", ENTITY_NAME, ValueType::Text);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Register (or look up) a typed key.
    pub fn register<T: PropertyType>(&self, owner: &str, name: &str) -> Result<TypedKey<T>, KeyError> {
        let info = self.register_dynamic(owner, name, T::VALUE_TYPE)?;
        Ok(TypedKey {
            info,
            _marker: PhantomData,
        })
    }

    /// Register (or look up) a key whose type is only known at runtime.
    pub fn register_dynamic(
        &self,
        owner: &str,
        name: &str,
        value_type: ValueType,
    ) -> Result<KeyInfo, KeyError> {
        if owner.trim().is_empty() {
            return Err(KeyError::InvalidArgument("owner cannot be empty".to_string()));
        }
        if name.trim().is_empty() {
            return Err(KeyError::InvalidArgument("name cannot be empty".to_string()));
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = state.by_name.get(name) {
            if existing.value_type != value_type {
                return Err(KeyError::KeyConflict {
                    name: name.to_string(),
                    existing: existing.value_type,
                    requested: value_type,
                });
            }
            return Ok(existing.clone());
        }

        let info = state.insert(owner, name, value_type);
        tracing::debug!("Registered key [{}] {} ({}) owner={}", info.id, info.name, info.value_type, info.owner);
        Ok(info)
    }

    /// Look up a key by name.
    pub fn lookup(&self, name: &str) -> Option<KeyInfo> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.by_name.get(name).cloned()
    }

    /// All registered keys in registration order.
    pub fn all_keys(&self) -> Vec<KeyInfo> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.by_name.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
