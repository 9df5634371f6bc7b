//! Rule sets built on the dynamic property layer.

pub mod combat;

pub use combat::{CombatKeys, WarriorSpec};
