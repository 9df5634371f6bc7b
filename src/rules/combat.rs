//! Combat rules for warrior entities.
//!
//! A consumer of the dynamic property layer: it registers its own keys in a
//! shared [`KeyRegistry`], builds warriors, and assembles a per-entity pipeline
//! of `apply_damage`, `grant_xp` and (for the Alliance) `mark_elite`.

use std::sync::Arc;

use crate::dynamic::{
    Entity, EntityPipeline, KeyError, KeyRegistry, OperationContext, PropertyError, TypedKey,
    ENTITY_NAME,
};
use crate::record::format_flag;

const OWNER: &str = "consumer_a";

/// XP needed for `mark_elite` to flag a warrior.
pub const ELITE_XP_THRESHOLD: i64 = 15;

/// Base XP granted per `grant_xp`, before the context multiplier.
pub const BASE_XP: f64 = 10.0;

/// Keys used by the combat rules.
#[derive(Debug, Clone)]
pub struct CombatKeys {
    pub name: TypedKey<String>,
    pub health: TypedKey<i64>,
    pub armor: TypedKey<i64>,
    pub damage: TypedKey<i64>,
    pub xp: TypedKey<i64>,
    pub faction: TypedKey<String>,
    pub elite: TypedKey<bool>,
    pub xp_multiplier: TypedKey<f64>,
    pub stop_on_dead: TypedKey<bool>,
    pub trace: TypedKey<Vec<String>>,
}

impl CombatKeys {
    /// Register (or reuse) every combat key in `registry`.
    pub fn register(registry: &KeyRegistry) -> Result<Self, KeyError> {
        Ok(Self {
            name: registry.register(OWNER, ENTITY_NAME)?,
            health: registry.register(OWNER, "game.health")?,
            armor: registry.register(OWNER, "game.armor")?,
            damage: registry.register(OWNER, "game.damage")?,
            xp: registry.register(OWNER, "game.xp")?,
            faction: registry.register(OWNER, "game.faction")?,
            elite: registry.register(OWNER, "game.elite")?,
            xp_multiplier: registry.register(OWNER, "ctx.xp_multiplier")?,
            stop_on_dead: registry.register(OWNER, "ctx.stop_on_dead")?,
            trace: registry.register(OWNER, "ctx.trace")?,
        })
    }
}

/// Starting stats for a warrior.
#[derive(Debug, Clone)]
pub struct WarriorSpec {
    pub entity_id: String,
    pub name: String,
    pub faction: String,
    pub health: i64,
    pub armor: i64,
    pub damage: i64,
}

pub fn create_warrior(keys: &CombatKeys, spec: WarriorSpec) -> Result<Entity, PropertyError> {
    let mut entity = Entity::new(spec.entity_id, "warrior");
    entity.set(&keys.name, spec.name)?;
    entity.set(&keys.faction, spec.faction)?;
    entity.set(&keys.health, spec.health)?;
    entity.set(&keys.armor, spec.armor)?;
    entity.set(&keys.damage, spec.damage)?;
    entity.set(&keys.xp, 0)?;
    entity.set(&keys.elite, false)?;
    Ok(entity)
}

pub fn create_operation_context(
    keys: &CombatKeys,
    xp_multiplier: f64,
    stop_on_dead: bool,
) -> Result<OperationContext, PropertyError> {
    let mut context = OperationContext::new();
    context.items.set(&keys.xp_multiplier, xp_multiplier)?;
    context.items.set(&keys.stop_on_dead, stop_on_dead)?;
    context.items.set(&keys.trace, Vec::new())?;
    Ok(context)
}

fn append_trace(keys: &CombatKeys, context: &mut OperationContext, message: String) -> Result<(), PropertyError> {
    let mut trace = context.items.get(&keys.trace, Vec::new());
    trace.push(message);
    context.items.set(&keys.trace, trace)
}

/// Reduce health by `damage - armor`, never below zero. Saturates at the
/// `i64` bounds.
pub fn apply_damage(keys: &CombatKeys, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError> {
    let hp = entity.get(&keys.health, 0);
    let armor = entity.get(&keys.armor, 0);
    let damage = entity.get(&keys.damage, 0);
    let actual_damage = damage.saturating_sub(armor).max(0);
    let next_hp = hp.saturating_sub(actual_damage).max(0);
    entity.set(&keys.health, next_hp)?;

    let name = entity.require(&keys.name)?;
    append_trace(
        keys,
        context,
        format!("{}: hp {}->{}, damage={}, armor={}", name, hp, next_hp, damage, armor),
    )
}

/// Grant XP to a living warrior. Dead warriors get a trace entry instead and,
/// with `ctx.stop_on_dead`, finish the context.
pub fn grant_xp(keys: &CombatKeys, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError> {
    let name = entity.require(&keys.name)?;
    let hp = entity.get(&keys.health, 0);
    if hp <= 0 {
        append_trace(keys, context, format!("{}: dead, xp skipped", name))?;
        if context.items.get(&keys.stop_on_dead, false) {
            context.finish();
        }
        return Ok(());
    }

    let current_xp = entity.get(&keys.xp, 0);
    let multiplier = context.items.get(&keys.xp_multiplier, 1.0);
    // Truncates toward zero.
    let gained = (BASE_XP * multiplier) as i64;
    entity.set(&keys.xp, current_xp.saturating_add(gained))?;
    append_trace(keys, context, format!("{}: xp +{}", name, gained))
}

pub fn mark_elite(keys: &CombatKeys, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError> {
    let is_elite = entity.get(&keys.xp, 0) >= ELITE_XP_THRESHOLD;
    entity.set(&keys.elite, is_elite)?;
    let name = entity.require(&keys.name)?;
    append_trace(keys, context, format!("{}: elite={}", name, format_flag(is_elite)))
}

/// Pipeline for one warrior; Alliance members also get `mark_elite`.
pub fn build_pipeline_for(keys: &Arc<CombatKeys>, entity: &Entity) -> EntityPipeline {
    let (k1, k2) = (Arc::clone(keys), Arc::clone(keys));
    let mut pipeline = EntityPipeline::new()
        .add("apply_damage", move |e: &mut Entity, ctx: &mut OperationContext| {
            apply_damage(&k1, e, ctx)
        })
        .add("grant_xp", move |e: &mut Entity, ctx: &mut OperationContext| {
            grant_xp(&k2, e, ctx)
        });

    if entity.get(&keys.faction, String::new()) == "Alliance" {
        let k3 = Arc::clone(keys);
        pipeline.push("mark_elite", move |e: &mut Entity, ctx: &mut OperationContext| {
            mark_elite(&k3, e, ctx)
        });
    }
    pipeline
}

pub fn read_trace(keys: &CombatKeys, context: &OperationContext) -> Result<Vec<String>, PropertyError> {
    context.items.require(&keys.trace)
}

/// Show that a second module reuses `game.health` and cannot retype it.
pub fn demonstrate_registry_conflict(registry: &KeyRegistry) -> String {
    let shared = match registry.register::<i64>("consumer_b", "game.health") {
        Ok(key) => key,
        Err(e) => return format!("Shared key unavailable: {}", e),
    };
    match registry.register::<String>("consumer_b", "game.health") {
        Err(e) => format!(
            "Shared key id={} reused safely. Conflict blocked: {}",
            shared.id(),
            e
        ),
        Ok(_) => "No conflict detected (unexpected)".to_string(),
    }
}
