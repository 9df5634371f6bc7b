//! Dynamic, strongly-typed entity properties.
//!
//! Keys are registered by name in a [`KeyRegistry`] and used to read and
//! write values on a [`PropertyBag`]. Entities and per-run operation contexts
//! both carry a bag, and an [`EntityPipeline`] runs named operations over
//! them until one of them finishes the context.

pub mod bag;
pub mod entity;
pub mod keys;
pub mod pipeline;

pub use bag::{PropertyBag, PropertyError};
pub use entity::Entity;
pub use keys::{KeyError, KeyInfo, KeyRegistry, PropertyType, PropertyValue, TypedKey, ValueType, ENTITY_NAME};
pub use pipeline::{EntityPipeline, Operation, OperationContext};
