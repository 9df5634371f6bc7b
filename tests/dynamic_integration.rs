//! Integration tests for shared typed keys and entity pipelines

use std::sync::Arc;
use std::thread;

use recflow::dynamic::keys::ENTITY_NAME;
use recflow::rules::combat::{self, CombatKeys, WarriorSpec};
use recflow::{
    Entity, EntityPipeline, KeyError, KeyRegistry, OperationContext, PropertyError, PropertyValue, ValueType,
};

#[test]
fn test_modules_share_keys_through_one_registry() {
    let registry = KeyRegistry::standard();
    let keys = CombatKeys::register(&registry).unwrap();

    // Combat reuses the library's entity.name key instead of minting a new one.
    let library_name = registry.lookup(ENTITY_NAME).unwrap();
    assert_eq!(keys.name.id(), library_name.id);
    assert_eq!(library_name.owner, "dynamiclib");

    // A second module asks for the same key and gets the same identity.
    let health = registry.register::<i64>("consumer_b", "game.health").unwrap();
    assert_eq!(health.id(), keys.health.id());
    assert_eq!(health.owner(), "consumer_a");

    let mut entity = Entity::new("E-1", "warrior");
    entity.set(&keys.health, 42).unwrap();
    assert_eq!(entity.require(&health).unwrap(), 42);
}

#[test]
fn test_conflicting_registration_is_rejected() {
    let registry = KeyRegistry::standard();
    CombatKeys::register(&registry).unwrap();
    let before = registry.len();

    let err = registry
        .register::<String>("consumer_b", "game.health")
        .unwrap_err();
    assert_eq!(
        err,
        KeyError::KeyConflict {
            name: "game.health".to_string(),
            existing: ValueType::Int,
            requested: ValueType::Text,
        }
    );
    assert_eq!(registry.len(), before);

    let message = combat::demonstrate_registry_conflict(&registry);
    assert!(message.starts_with("Shared key id="), "{}", message);
    assert!(message.contains("already registered with type int, requested text"));
}

#[test]
fn test_concurrent_modules_register_one_key() {
    let registry = Arc::new(KeyRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .register::<f64>(&format!("module_{}", i), "stats.ratio")
                    .unwrap()
                    .id()
            })
        })
        .collect();

    let ids: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_full_warrior_run() {
    let registry = KeyRegistry::standard();
    let keys = Arc::new(CombatKeys::register(&registry).unwrap());

    let mut warrior = combat::create_warrior(
        &keys,
        WarriorSpec {
            entity_id: "E-100".to_string(),
            name: "Arthas".to_string(),
            faction: "Alliance".to_string(),
            health: 120,
            armor: 25,
            damage: 40,
        },
    )
    .unwrap();
    let mut context = combat::create_operation_context(&keys, 1.5, true).unwrap();

    combat::build_pipeline_for(&keys, &warrior)
        .execute(&mut warrior, &mut context)
        .unwrap();

    let snapshot = warrior.snapshot();
    assert_eq!(snapshot["__entity_id"], PropertyValue::Text("E-100".to_string()));
    assert_eq!(snapshot["game.health"], PropertyValue::Int(105));
    assert_eq!(snapshot["game.xp"], PropertyValue::Int(15));
    assert_eq!(snapshot["game.elite"], PropertyValue::Bool(true));
    assert_eq!(snapshot[ENTITY_NAME], PropertyValue::Text("Arthas".to_string()));
    assert!(!context.is_done());
}

#[test]
fn test_custom_pipeline_over_shared_keys() {
    let registry = KeyRegistry::standard();
    let visits = registry.register::<i64>("audit", "audit.visits").unwrap();
    let tags = registry.register::<Vec<String>>("audit", "audit.tags").unwrap();

    let (v1, v2, t) = (visits.clone(), visits.clone(), tags.clone());
    let pipeline = EntityPipeline::new()
        .add("count", move |entity: &mut Entity, _ctx: &mut OperationContext| {
            let current = entity.get(&v1, 0);
            entity.set(&v1, current + 1)
        })
        .add("tag", move |entity: &mut Entity, ctx: &mut OperationContext| -> Result<(), PropertyError> {
            entity.set(&t, vec!["seen".to_string()])?;
            ctx.finish();
            Ok(())
        })
        .add("count_again", move |entity: &mut Entity, _ctx: &mut OperationContext| {
            let current = entity.get(&v2, 0);
            entity.set(&v2, current + 1)
        });

    let mut entity = Entity::new("E-7", "visitor");
    let mut context = OperationContext::new();
    pipeline.execute(&mut entity, &mut context).unwrap();

    assert_eq!(entity.require(&visits).unwrap(), 1);
    assert_eq!(entity.require(&tags).unwrap(), vec!["seen".to_string()]);
    assert!(context.is_done());
}

#[test]
fn test_pipeline_error_surfaces_type_mismatch() {
    let registry = KeyRegistry::standard();
    let keys = CombatKeys::register(&registry).unwrap();
    let name_info = registry.lookup(ENTITY_NAME).unwrap();

    let mut entity = Entity::new("E-2", "warrior");
    let err = entity
        .properties
        .set_value(&name_info, PropertyValue::Int(3))
        .unwrap_err();
    assert_eq!(
        err,
        PropertyError::TypeMismatch {
            key: ENTITY_NAME.to_string(),
            expected: ValueType::Text,
            actual: ValueType::Int,
        }
    );

    assert_eq!(
        entity.require(&keys.health).unwrap_err(),
        PropertyError::MissingKey {
            key: "game.health".to_string()
        }
    );
}
