//! Named entities carrying a dynamic property bag.

use std::collections::BTreeMap;

use super::bag::{PropertyBag, PropertyError};
use super::keys::{PropertyType, PropertyValue, TypedKey};

/// A named thing with loosely-structured, strongly-typed properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_id: String,
    pub entity_type: String,
    pub properties: PropertyBag,
}

impl Entity {
    pub fn new(entity_id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type: entity_type.into(),
            properties: PropertyBag::new(),
        }
    }

    pub fn set<T: PropertyType>(&mut self, key: &TypedKey<T>, value: T) -> Result<(), PropertyError> {
        self.properties.set(key, value)
    }

    pub fn get<T: PropertyType>(&self, key: &TypedKey<T>, default: T) -> T {
        self.properties.get(key, default)
    }

    pub fn require<T: PropertyType>(&self, key: &TypedKey<T>) -> Result<T, PropertyError> {
        self.properties.require(key)
    }

    /// Property snapshot plus `__entity_id` and `__entity_type`.
    pub fn snapshot(&self) -> BTreeMap<String, PropertyValue> {
        let mut data = self.properties.snapshot();
        data.insert(
            "__entity_id".to_string(),
            PropertyValue::Text(self.entity_id.clone()),
        );
        data.insert(
            "__entity_type".to_string(),
            PropertyValue::Text(self.entity_type.clone()),
        );
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::keys::KeyRegistry;

    #[test]
    fn test_entity_snapshot_includes_identity() {
        let registry = KeyRegistry::new();
        let armor = registry.register::<i64>("a", "game.armor").unwrap();

        let mut entity = Entity::new("E-1", "warrior");
        entity.set(&armor, 25).unwrap();

        let snapshot = entity.snapshot();
        assert_eq!(snapshot.get("game.armor"), Some(&PropertyValue::Int(25)));
        assert_eq!(
            snapshot.get("__entity_id"),
            Some(&PropertyValue::Text("E-1".to_string()))
        );
        assert_eq!(
            snapshot.get("__entity_type"),
            Some(&PropertyValue::Text("warrior".to_string()))
        );
    }
}
