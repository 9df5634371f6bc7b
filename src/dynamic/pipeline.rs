//! Short-circuiting operation pipelines over entities.

use super::bag::{PropertyBag, PropertyError};
use super::entity::Entity;

/// Per-execution state shared by the operations of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub items: PropertyBag,
    is_done: bool,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// Stop the pipeline before its next operation. Cannot be undone.
    pub fn finish(&mut self) {
        self.is_done = true;
    }
}

/// An operation applied to an entity within a pipeline run.
///
/// Operations return nothing on success; their effect is the mutation of the
/// entity's properties and the context's items.
pub trait Operation: Send + Sync {
    fn run(&self, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError>;
}

impl<F> Operation for F
where
    F: Fn(&mut Entity, &mut OperationContext) -> Result<(), PropertyError> + Send + Sync,
{
    fn run(&self, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError> {
        self(entity, context)
    }
}

/// Ordered list of named operations.
#[derive(Default)]
pub struct EntityPipeline {
    operations: Vec<(String, Box<dyn Operation>)>,
}

impl EntityPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: impl Into<String>, operation: impl Operation + 'static) -> Self {
        self.push(name, operation);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, operation: impl Operation + 'static) {
        self.operations.push((name.into(), Box::new(operation)));
    }

    /// Run operations in order until one fails or the context is finished.
    pub fn execute(&self, entity: &mut Entity, context: &mut OperationContext) -> Result<(), PropertyError> {
        for (name, operation) in &self.operations {
            if context.is_done() {
                tracing::debug!("Pipeline stopped before '{}' on {}", name, entity.entity_id);
                break;
            }
            tracing::debug!("Running '{}' on {}", name, entity.entity_id);
            operation.run(entity, context)?;
        }
        Ok(())
    }

    /// Operation names in execution order.
    pub fn describe(&self) -> Vec<String> {
        self.operations.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::keys::KeyRegistry;

    #[test]
    fn test_operations_run_in_order() {
        let registry = KeyRegistry::new();
        let trace = registry.register::<Vec<String>>("t", "ctx.trace").unwrap();
        let (t1, t2) = (trace.clone(), trace.clone());

        let pipeline = EntityPipeline::new()
            .add("first", move |_: &mut Entity, ctx: &mut OperationContext| {
                let mut items = ctx.items.get(&t1, Vec::new());
                items.push("first".to_string());
                ctx.items.set(&t1, items)
            })
            .add("second", move |_: &mut Entity, ctx: &mut OperationContext| {
                let mut items = ctx.items.get(&t2, Vec::new());
                items.push("second".to_string());
                ctx.items.set(&t2, items)
            });

        let mut entity = Entity::new("E-1", "thing");
        let mut context = OperationContext::new();
        pipeline.execute(&mut entity, &mut context).unwrap();

        assert_eq!(pipeline.describe(), vec!["first", "second"]);
        assert_eq!(context.items.require(&trace).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_finished_context_skips_remaining() {
        let registry = KeyRegistry::new();
        let counter = registry.register::<i64>("t", "ctx.counter").unwrap();
        let (c1, c2) = (counter.clone(), counter.clone());

        let pipeline = EntityPipeline::new()
            .add("stop", move |_: &mut Entity, ctx: &mut OperationContext| -> Result<(), PropertyError> {
                ctx.items.set(&c1, 1)?;
                ctx.finish();
                Ok(())
            })
            .add("never", move |_: &mut Entity, ctx: &mut OperationContext| {
                ctx.items.set(&c2, 2)
            });

        let mut entity = Entity::new("E-1", "thing");
        let mut context = OperationContext::new();
        pipeline.execute(&mut entity, &mut context).unwrap();

        assert!(context.is_done());
        assert_eq!(context.items.require(&counter).unwrap(), 1);
    }

    #[test]
    fn test_already_finished_context_runs_nothing() {
        let registry = KeyRegistry::new();
        let counter = registry.register::<i64>("t", "ctx.counter").unwrap();
        let c1 = counter.clone();

        let pipeline = EntityPipeline::new().add("count", move |_: &mut Entity, ctx: &mut OperationContext| {
            ctx.items.set(&c1, 1)
        });

        let mut entity = Entity::new("E-1", "thing");
        let mut context = OperationContext::new();
        context.finish();
        pipeline.execute(&mut entity, &mut context).unwrap();

        assert!(!context.items.has(counter.info()));
    }

    #[test]
    fn test_operation_error_aborts_run() {
        let registry = KeyRegistry::new();
        let name = registry.register::<String>("t", "entity.name").unwrap();

        let pipeline = EntityPipeline::new().add("needs_name", move |e: &mut Entity, _: &mut OperationContext| {
            e.require(&name).map(|_| ())
        });

        let mut entity = Entity::new("E-1", "thing");
        let mut context = OperationContext::new();
        let result = pipeline.execute(&mut entity, &mut context);

        assert!(matches!(result, Err(PropertyError::MissingKey { .. })));
    }
}
