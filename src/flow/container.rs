//! Minimal dependency-injection container.
//!
//! Services are registered by string key on a [`ServiceCollection`] as
//! eagerly-known instances, lazily-built singletons, or transients built on
//! every request. [`ServiceCollection::build_provider`] snapshots the
//! registrations into a [`ServiceProvider`], which resolves keys on demand.
//! Factories receive the provider, so a dependency graph is just factories
//! looking up other keys.
//!
//! A dependency cycle fails with [`FlowError::CircularDependency`], both when
//! one thread re-enters a key it is building and when two threads each build
//! one side of the cycle and would otherwise wait on each other forever.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recflow::flow::ServiceCollection;
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_instance("greeting", Arc::new("hello".to_string()));
//! services.add_singleton("shout", |provider| {
//!     let greeting: Arc<String> = provider.get("greeting")?;
//!     Ok(Arc::new(greeting.to_uppercase()))
//! });
//!
//! let provider = services.build_provider();
//! let shout: Arc<String> = provider.get("shout").unwrap();
//! assert_eq!(shout.as_str(), "HELLO");
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use super::FlowError;

type Service = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ServiceProvider) -> Result<Service, FlowError> + Send + Sync>;

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Keys currently being built on this thread, tagged by provider id.
    static RESOLVING: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&ServiceProvider) -> Result<T, FlowError> + Send + Sync + 'static,
{
    Arc::new(move |provider: &ServiceProvider| factory(provider).map(|service| Arc::new(service) as Service))
}

/// Mutable set of service registrations.
///
/// Registering a key again replaces the earlier registration, whatever its
/// lifetime was.
#[derive(Clone, Default)]
pub struct ServiceCollection {
    singleton_factories: HashMap<String, Factory>,
    singletons: HashMap<String, Service>,
    transient_factories: HashMap<String, Factory>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn forget(&mut self, key: &str) {
        self.singleton_factories.remove(key);
        self.singletons.remove(key);
        self.transient_factories.remove(key);
    }

    /// Register an already-built singleton.
    pub fn add_singleton_instance<T>(&mut self, key: impl Into<String>, instance: T) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        self.forget(&key);
        self.singletons.insert(key, Arc::new(instance));
        self
    }

    /// Register a singleton built on first request, at most once per provider.
    pub fn add_singleton<T, F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T, FlowError> + Send + Sync + 'static,
    {
        let key = key.into();
        self.forget(&key);
        self.singleton_factories.insert(key, erase(factory));
        self
    }

    /// Register a service built afresh on every request.
    pub fn add_transient<T, F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceProvider) -> Result<T, FlowError> + Send + Sync + 'static,
    {
        let key = key.into();
        self.forget(&key);
        self.transient_factories.insert(key, erase(factory));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.singletons.contains_key(key)
            || self.singleton_factories.contains_key(key)
            || self.transient_factories.contains_key(key)
    }

    /// Snapshot the current registrations into a provider.
    ///
    /// Later changes to this collection do not affect the provider.
    pub fn build_provider(&self) -> ServiceProvider {
        ServiceProvider {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
            singletons: Mutex::new(self.singletons.clone()),
            singleton_factories: self
                .singleton_factories
                .iter()
                .map(|(key, factory)| {
                    (
                        key.clone(),
                        SingletonSlot {
                            factory: Arc::clone(factory),
                            build_lock: Mutex::new(()),
                        },
                    )
                })
                .collect(),
            transient_factories: self.transient_factories.clone(),
            builds: Mutex::new(BuildGraph::default()),
        }
    }
}

struct SingletonSlot {
    factory: Factory,
    /// Held while the factory runs so concurrent requests build it once.
    build_lock: Mutex<()>,
}

/// Which thread builds each singleton, and which singleton each blocked
/// thread is waiting for.
#[derive(Default)]
struct BuildGraph {
    builders: HashMap<String, ThreadId>,
    waiting: HashMap<ThreadId, String>,
}

impl BuildGraph {
    /// Whether waiting for `key` would close a chain of waits back to `me`.
    fn closes_cycle(&self, me: ThreadId, key: &str) -> bool {
        let mut next = key;
        for _ in 0..=self.builders.len() {
            let Some(owner) = self.builders.get(next) else {
                return false;
            };
            if *owner == me {
                return true;
            }
            match self.waiting.get(owner) {
                Some(key) => next = key,
                None => return false,
            }
        }
        false
    }
}

/// Exclusive right to build one singleton; clears the builder entry before
/// the slot lock is released.
struct BuildTicket<'a> {
    graph: &'a Mutex<BuildGraph>,
    key: String,
    _slot: MutexGuard<'a, ()>,
}

impl Drop for BuildTicket<'_> {
    fn drop(&mut self) {
        self.graph
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .builders
            .remove(&self.key);
    }
}

/// Pops the resolution stack entry when a factory returns or unwinds.
struct ResolvingGuard;

impl ResolvingGuard {
    fn enter(provider_id: u64, key: &str) -> Result<Self, FlowError> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(id, k)| *id == provider_id && k == key) {
                return Err(FlowError::CircularDependency(key.to_string()));
            }
            stack.push((provider_id, key.to_string()));
            Ok(ResolvingGuard)
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Resolves services registered on a [`ServiceCollection`].
///
/// The set of registered keys is fixed at construction; only the singleton
/// cache changes, as singletons are built on first request.
pub struct ServiceProvider {
    id: u64,
    singletons: Mutex<HashMap<String, Service>>,
    singleton_factories: HashMap<String, SingletonSlot>,
    transient_factories: HashMap<String, Factory>,
    builds: Mutex<BuildGraph>,
}

impl ServiceProvider {
    /// Wait for the build lock of `key`, unless the wait would deadlock.
    fn lock_slot<'a>(&'a self, key: &str, slot: &'a SingletonSlot) -> Result<BuildTicket<'a>, FlowError> {
        let me = thread::current().id();
        {
            let mut graph = self.builds.lock().unwrap_or_else(|e| e.into_inner());
            if graph.closes_cycle(me, key) {
                return Err(FlowError::CircularDependency(key.to_string()));
            }
            graph.waiting.insert(me, key.to_string());
        }

        let guard = slot.build_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut graph = self.builds.lock().unwrap_or_else(|e| e.into_inner());
        graph.waiting.remove(&me);
        graph.builders.insert(key.to_string(), me);
        Ok(BuildTicket {
            graph: &self.builds,
            key: key.to_string(),
            _slot: guard,
        })
    }

    fn cached(&self, key: &str) -> Option<Service> {
        self.singletons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Resolve a service without checking its type.
    ///
    /// Lookup order: built singletons, then singleton factories (built,
    /// cached and returned), then transient factories (built, never cached).
    pub fn get_service(&self, key: &str) -> Result<Service, FlowError> {
        if let Some(service) = self.cached(key) {
            return Ok(service);
        }

        if let Some(slot) = self.singleton_factories.get(key) {
            let _guard = ResolvingGuard::enter(self.id, key)?;
            let _build = self.lock_slot(key, slot)?;
            // Another thread may have finished building while we waited.
            if let Some(service) = self.cached(key) {
                return Ok(service);
            }

            tracing::debug!("Building singleton service '{}'", key);
            let service = (slot.factory)(self)?;
            self.singletons
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key.to_string(), Arc::clone(&service));
            return Ok(service);
        }

        if let Some(factory) = self.transient_factories.get(key) {
            let _guard = ResolvingGuard::enter(self.id, key)?;
            tracing::debug!("Building transient service '{}'", key);
            return factory(self);
        }

        Err(FlowError::ServiceNotFound(key.to_string()))
    }

    /// Resolve a service and clone it out as `T`.
    ///
    /// Services are usually registered as `Arc<...>`, so the clone shares the
    /// singleton instance.
    pub fn get<T>(&self, key: &str) -> Result<T, FlowError>
    where
        T: Any + Send + Sync + Clone,
    {
        let service = self.get_service(key)?;
        service
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| FlowError::ServiceTypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.singleton_factories.contains_key(key)
            || self.transient_factories.contains_key(key)
            || self
                .singletons
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains_key(key)
    }

    /// Every resolvable key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.singleton_factories.keys().cloned().collect();
        keys.extend(self.transient_factories.keys().cloned());
        keys.extend(
            self.singletons
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .keys()
                .cloned(),
        );
        keys.into_iter().collect()
    }
}
