//! # The Container — heart of Stowage
//!
//! A name-keyed service container. Services are registered as literal
//! instances or as [`ServiceClass`]es, and resolved on demand together with
//! their whole dependency graph.
//!
//! # Architecture
//! ```text
//! Discovery ──register──>  Container ──get──> resolve (one ResolutionContext per call)
//!                              │                     │
//!                              └──── Registry <──────┘  (read plans, cache singletons)
//! ```
//!
//! The container is a cheap handle: clones share one store. The store is
//! only locked to read a descriptor or to write one back; constructors and
//! module loaders always run unlocked, so they may call back into the
//! container.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use stowage_container::prelude::*;
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let container = Container::new();
//! container.register_instance("config", Arc::new(Config { url: "postgres://localhost".into() }))?;
//! container.register_class(
//!     ServiceDef::new("db")
//!         .requires(["config"])
//!         .lifecycle("singleton")
//!         .build(|args| {
//!             let config = args.get::<Config>(0)?;
//!             Ok(instance(Database { url: config.url.clone() }))
//!         }),
//! )?;
//!
//! let db: Arc<Database> = container.require("db")?;
//! assert_eq!(db.url, "postgres://localhost");
//! assert!(container.get("mailer?")?.is_none());
//! # Ok::<(), ContainerError>(())
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use regex::Regex;
use stowage_support::rendering::suggest_similar;
use tracing::{trace, warn};

use crate::class::{Args, Instance, ServiceClass, instance};
use crate::context::{ResolutionContext, Visit};
use crate::discovery::loader::ModuleLoader;
use crate::error::{
    ContainerError, CyclicDependencyError, InvalidNameError, Result, ServiceNotFoundError,
    StaleIndexError,
};
use crate::lifecycle::Lifecycle;
use crate::name::{self, Lookup};
use crate::registry::{Descriptor, Plan, Recipe, Registry};

const MAX_SUGGESTIONS: usize = 3;

struct Inner {
    registry: RwLock<Registry>,
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Service container.
///
/// Create one at process start and pass it (or clones of it) to everything
/// that registers or resolves services.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Name the container registers its own [`ContainerRef`] under.
    pub const SELF_NAME: &'static str = "app";

    /// Creates a container holding only its own handle under
    /// [`SELF_NAME`](Self::SELF_NAME).
    pub fn new() -> Self {
        let container = Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::new()),
            }),
        };
        let handle = container.downgrade();
        container
            .inner
            .registry
            .write()
            .insert(Descriptor::instance(Self::SELF_NAME.to_string(), instance(handle)));
        container
    }

    /// A handle that does not keep the container alive.
    pub fn downgrade(&self) -> ContainerRef {
        ContainerRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── Registration ──

    /// Registers a literal instance under `name`, replacing any previous
    /// descriptor.
    ///
    /// # Errors
    /// [`ContainerError::InvalidName`] if `name` is empty or ends in `?`.
    pub fn register_instance<T: Any + Send + Sync>(
        &self,
        name: &str,
        value: Arc<T>,
    ) -> Result<()> {
        self.register_any(name, value)
    }

    /// Registers an already type-erased instance under `name`.
    pub fn register_any(&self, name: &str, value: Instance) -> Result<()> {
        name::validate(name)?;
        self.inner
            .registry
            .write()
            .insert(Descriptor::instance(name.to_string(), value));
        Ok(())
    }

    /// Registers a class under the name it provides and returns that name.
    ///
    /// The declared lifecycle is not checked here; an unknown value fails
    /// the first resolution that needs the service.
    ///
    /// # Errors
    /// [`ContainerError::InvalidName`] if the class provides no usable name.
    pub fn register_class(&self, class: Arc<dyn ServiceClass>) -> Result<String> {
        self.insert_class(class, None)
    }

    /// Like [`register_class`](Self::register_class), tagging the descriptor
    /// with the file it was discovered in.
    pub fn register_class_from(
        &self,
        class: Arc<dyn ServiceClass>,
        source: impl Into<PathBuf>,
    ) -> Result<String> {
        self.insert_class(class, Some(source.into()))
    }

    /// Registers an index-only descriptor. The class is loaded from `source`
    /// through `loader` on first resolution.
    pub fn register_indexed(
        &self,
        name: &str,
        source: impl Into<PathBuf>,
        requires: Vec<String>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<()> {
        name::validate(name)?;
        self.inner.registry.write().insert(Descriptor::indexed(
            name.to_string(),
            source.into(),
            requires,
            loader,
        ));
        Ok(())
    }

    fn insert_class(
        &self,
        class: Arc<dyn ServiceClass>,
        source: Option<PathBuf>,
    ) -> Result<String> {
        let Some(name) = class.provides().map(str::to_owned) else {
            return Err(ContainerError::InvalidName(InvalidNameError {
                name: String::new(),
                reason: "the class does not declare a provided name",
            }));
        };
        name::validate(&name)?;
        self.inner
            .registry
            .write()
            .insert(Descriptor::class(name.clone(), class, source));
        Ok(name)
    }

    // ── Lookup without resolution ──

    /// Returns `true` if `name` (with any `?` suffix stripped) is registered.
    pub fn has(&self, name: &str) -> bool {
        self.inner.registry.read().contains(Lookup::parse(name).name())
    }

    /// Registered names fully matching the regular expression `pattern`, in
    /// registration order.
    ///
    /// ```rust
    /// use stowage_container::prelude::*;
    ///
    /// let container = Container::new();
    /// container.register_instance("modules.users", std::sync::Arc::new(1u8))?;
    /// container.register_instance("db", std::sync::Arc::new(2u8))?;
    /// assert_eq!(container.search("modules.*")?, vec!["modules.users"]);
    /// # Ok::<(), ContainerError>(())
    /// ```
    pub fn search(&self, pattern: &str) -> Result<Vec<String>> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            ContainerError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(self
            .inner
            .registry
            .read()
            .names()
            .filter(|name| regex.is_match(name))
            .map(str::to_owned)
            .collect())
    }

    /// All registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.registry.read().names().map(str::to_owned).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.read().is_empty()
    }

    /// Declared dependency names of `name`, without loading anything.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.inner.registry.read().get(name).map(Descriptor::dependencies)
    }

    /// File a discovered service came from.
    pub fn source_of(&self, name: &str) -> Option<PathBuf> {
        self.inner.registry.read().get(name).and_then(|d| d.source.clone())
    }

    // ── Resolution ──

    /// Resolves `name` and its dependency graph.
    ///
    /// Returns `Ok(None)` only for an optional lookup (`"name?"`) of an
    /// unregistered service.
    ///
    /// # Errors
    /// - [`ContainerError::ServiceNotFound`] — mandatory name not registered
    /// - [`ContainerError::CyclicDependency`] — the graph loops back on itself
    /// - [`ContainerError::InvalidLifecycle`] — unknown declared lifecycle
    /// - [`ContainerError::StaleIndex`] — indexed file provides another name
    /// - [`ContainerError::ConstructionFailed`] — a constructor failed
    pub fn get(&self, name: &str) -> Result<Option<Instance>> {
        self.get_with(name, Vec::new())
    }

    /// Like [`get`](Self::get), appending `extra` after the resolved
    /// dependencies when the service has to be constructed.
    pub fn get_with(&self, name: &str, extra: Vec<Instance>) -> Result<Option<Instance>> {
        trace!(service = %name, extra = extra.len(), "Resolving");
        let mut context = ResolutionContext::new();
        self.resolve(name, extra, &mut context)
    }

    /// Resolves a mandatory service and downcasts it to `T`.
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.require("db")?;
    /// ```
    pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let found = self
            .get(name)?
            .ok_or_else(|| self.not_found(Lookup::parse(name).name(), None))?;

        found.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
    }

    fn resolve(
        &self,
        requested: &str,
        extra: Vec<Instance>,
        context: &mut ResolutionContext,
    ) -> Result<Option<Instance>> {
        let lookup = Lookup::parse(requested);
        let name = lookup.name();

        let plan = self.inner.registry.read().plan(name);
        let recipe = match plan {
            None if lookup.is_optional() => {
                trace!(service = %name, "Optional service absent");
                return Ok(None);
            }
            None => return Err(self.not_found(name, context.current())),
            Some(Plan::Ready(found)) => return Ok(Some(found)),
            Some(Plan::Build(recipe)) => recipe,
        };

        match context.visit(name) {
            Visit::InProgress => {
                let chain = context.cycle_through(name);
                warn!(service = %name, cycle = ?chain, "Cyclic dependency detected");
                return Err(ContainerError::CyclicDependency(CyclicDependencyError {
                    name: name.to_string(),
                    chain,
                }));
            }
            Visit::Resolved(shared) => {
                trace!(service = %name, "Reusing instance from this request");
                return Ok(Some(shared));
            }
            Visit::Unseen => {}
        }

        context.enter(name);

        let class = match recipe {
            Recipe::Loaded(class) => class,
            Recipe::Indexed { source, requires, loader } => {
                self.load_indexed(name, &source, &requires, loader.as_ref())?
            }
        };

        let lifecycle = class.lifecycle().parse::<Lifecycle>().map_err(|unknown| {
            ContainerError::InvalidLifecycle {
                name: name.to_string(),
                value: unknown.0,
            }
        })?;

        let built = self.instantiate(name, &class, extra, context)?;

        let built = match lifecycle {
            Lifecycle::PerRequest => {
                context.leave(name, Some(Arc::clone(&built)));
                built
            }
            Lifecycle::Unique => {
                context.leave(name, None);
                built
            }
            Lifecycle::Singleton => {
                context.leave(name, None);
                self.inner.registry.write().cache_singleton(name, &class, built)
            }
        };

        trace!(service = %name, lifecycle = %lifecycle, "Resolved");
        Ok(Some(built))
    }

    /// Resolves every declared dependency in order, against the same
    /// context, then calls the constructor.
    fn instantiate(
        &self,
        name: &str,
        class: &Arc<dyn ServiceClass>,
        extra: Vec<Instance>,
        context: &mut ResolutionContext,
    ) -> Result<Instance> {
        let requires = class.requires();
        let mut values = Vec::with_capacity(requires.len() + extra.len());
        for dependency in &requires {
            values.push(self.resolve(dependency, Vec::new(), context)?);
        }
        values.extend(extra.into_iter().map(Some));

        trace!(service = %name, args = values.len(), "Constructing");
        class
            .construct(Args::new(values))
            .map_err(|source| ContainerError::ConstructionFailed {
                name: name.to_string(),
                source,
            })
    }

    /// Loads the class behind an index-only descriptor and checks that it
    /// still provides `name`.
    fn load_indexed(
        &self,
        name: &str,
        source: &Path,
        indexed_requires: &[String],
        loader: &dyn ModuleLoader,
    ) -> Result<Arc<dyn ServiceClass>> {
        let loaded = loader.load(source).map_err(|err| ContainerError::ModuleLoad {
            path: source.to_path_buf(),
            source: err,
        })?;

        let found = loaded.as_ref().and_then(|c| c.provides()).map(str::to_owned);
        let class = match loaded {
            Some(class) if found.as_deref() == Some(name) => class,
            _ => {
                return Err(ContainerError::StaleIndex(StaleIndexError {
                    name: name.to_string(),
                    path: source.to_path_buf(),
                    found,
                }));
            }
        };

        let requires = class.requires();
        if requires != indexed_requires {
            warn!(
                service = %name,
                indexed = ?indexed_requires,
                declared = ?requires,
                "Indexed dependencies differ from the loaded class"
            );
        }

        self.inner
            .registry
            .write()
            .complete_load(name, source, Arc::clone(&class));
        Ok(class)
    }

    fn not_found(&self, name: &str, required_by: Option<&str>) -> ContainerError {
        let registry = self.inner.registry.read();
        let available: Vec<&str> = registry.names().collect();
        ContainerError::ServiceNotFound(ServiceNotFoundError {
            requested: name.to_string(),
            required_by: required_by.map(str::to_owned),
            suggestions: suggest_similar(name, &available, MAX_SUGGESTIONS),
        })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// ContainerRef
// ═══════════════════════════════════════════

/// Weak handle to a [`Container`], registered in every container under
/// [`Container::SELF_NAME`]. Services that need the container itself depend
/// on `"app"` and upgrade the handle.
#[derive(Clone)]
pub struct ContainerRef {
    inner: Weak<Inner>,
}

impl ContainerRef {
    /// Returns the container if it is still alive.
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerRef};
    pub use crate::class::{Args, Instance, ServiceClass, ServiceDef, instance};
    pub use crate::discovery::{Discovery, DiscoveryConfig, DiscoveryMode, DiscoveryReport};
    pub use crate::discovery::loader::{CatalogLoader, ModuleLoader, ServiceModule};
    pub use crate::error::{BoxError, ContainerError, Result};
    pub use crate::lifecycle::Lifecycle;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ServiceDef;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Generic test service: keeps whatever it was constructed with.
    struct Node {
        args: Vec<Option<Instance>>,
    }

    impl Node {
        fn dep(&self, index: usize) -> Arc<Node> {
            self.args[index]
                .clone()
                .expect("dependency present")
                .downcast::<Node>()
                .expect("dependency is a Node")
        }
    }

    fn node(name: &str, requires: &[&str], lifecycle: &str) -> Arc<dyn ServiceClass> {
        ServiceDef::new(name)
            .requires(requires.iter().copied())
            .lifecycle(lifecycle)
            .build(|args| Ok(instance(Node { args: args.into_inner() })))
    }

    fn get_node(container: &Container, name: &str) -> Arc<Node> {
        container.require::<Node>(name).unwrap()
    }

    #[test]
    fn container_registers_itself() {
        let container = Container::new();
        assert!(container.has("app"));

        let handle: Arc<ContainerRef> = container.require("app").unwrap();
        let upgraded = handle.upgrade().expect("container alive");
        assert!(upgraded.has("app"));
    }

    #[test]
    fn self_handle_does_not_keep_container_alive() {
        let container = Container::new();
        let handle: Arc<ContainerRef> = container.require("app").unwrap();
        drop(container);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn resolve_registered_instance() {
        let container = Container::new();
        container.register_instance("answer", Arc::new(42i32)).unwrap();

        let value: Arc<i32> = container.require("answer").unwrap();
        assert_eq!(*value, 42);
    }

    #[test]
    fn register_rejects_bad_names() {
        let container = Container::new();
        assert!(matches!(
            container.register_instance("", Arc::new(1u8)),
            Err(ContainerError::InvalidName(_))
        ));
        assert!(matches!(
            container.register_instance("db?", Arc::new(1u8)),
            Err(ContainerError::InvalidName(_))
        ));
        assert!(matches!(
            container.register_class(node("", &[], "perRequest")),
            Err(ContainerError::InvalidName(_))
        ));
        assert_eq!(container.names(), vec!["app"]);
    }

    #[test]
    fn singleton_is_shared_across_calls() {
        let container = Container::new();
        container.register_class(node("db", &[], "singleton")).unwrap();

        let first = get_node(&container, "db");
        let second = get_node(&container, "db");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn per_request_is_shared_by_siblings_only() {
        let container = Container::new();
        container.register_class(node("session", &[], "perRequest")).unwrap();
        container.register_class(node("left", &["session"], "perRequest")).unwrap();
        container.register_class(node("right", &["session"], "perRequest")).unwrap();
        container.register_class(node("root", &["left", "right"], "perRequest")).unwrap();

        let root = get_node(&container, "root");
        let left_session = root.dep(0).dep(0);
        let right_session = root.dep(1).dep(0);
        assert!(Arc::ptr_eq(&left_session, &right_session));

        let again = get_node(&container, "root");
        assert!(!Arc::ptr_eq(&again.dep(0).dep(0), &left_session));
        assert!(!Arc::ptr_eq(&again, &root));
    }

    #[test]
    fn unique_is_never_shared() {
        let container = Container::new();
        container.register_class(node("token", &[], "unique")).unwrap();
        container.register_class(node("left", &["token"], "perRequest")).unwrap();
        container.register_class(node("right", &["token"], "perRequest")).unwrap();
        container.register_class(node("root", &["left", "right", "token"], "perRequest")).unwrap();

        let root = get_node(&container, "root");
        let left = root.dep(0).dep(0);
        let right = root.dep(1).dep(0);
        let direct = root.dep(2);
        assert!(!Arc::ptr_eq(&left, &right));
        assert!(!Arc::ptr_eq(&left, &direct));
        assert!(!Arc::ptr_eq(&right, &direct));
    }

    #[test]
    fn singleton_shared_below_per_request_services() {
        let container = Container::new();
        container.register_class(node("a", &["b"], "perRequest")).unwrap();
        container.register_class(node("b", &["d"], "perRequest")).unwrap();
        container.register_class(node("d", &[], "singleton")).unwrap();

        let first = get_node(&container, "a");
        let second = get_node(&container, "a");
        assert!(!Arc::ptr_eq(&first, &second));

        let d1 = first.dep(0).dep(0);
        let d2 = second.dep(0).dep(0);
        assert!(Arc::ptr_eq(&d1, &d2));
        assert!(Arc::ptr_eq(&d1, &get_node(&container, "d")));
    }

    #[test]
    fn detect_direct_cycle() {
        let container = Container::new();
        container.register_class(node("a", &["b"], "perRequest")).unwrap();
        container.register_class(node("b", &["a"], "perRequest")).unwrap();

        match container.get("a") {
            Err(ContainerError::CyclicDependency(err)) => {
                assert_eq!(err.name, "a");
                assert_eq!(err.chain, vec!["a", "b", "a"]);
            }
            other => panic!("Expected CyclicDependency, got: {other:?}"),
        }
    }

    #[test]
    fn detect_transitive_cycle_and_recover() {
        let container = Container::new();
        container.register_class(node("a", &["b"], "perRequest")).unwrap();
        container.register_class(node("b", &["c"], "perRequest")).unwrap();
        container.register_class(node("c", &["a"], "perRequest")).unwrap();

        assert!(matches!(
            container.get("a"),
            Err(ContainerError::CyclicDependency(_))
        ));

        // Remove the back-edge c → a.
        container.register_class(node("c", &[], "perRequest")).unwrap();
        assert!(container.get("a").unwrap().is_some());
    }

    #[test]
    fn detect_self_dependency() {
        let container = Container::new();
        container.register_class(node("a", &["a"], "singleton")).unwrap();

        assert!(matches!(
            container.get("a"),
            Err(ContainerError::CyclicDependency(_))
        ));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let container = Container::new();
        container.register_class(node("d", &[], "unique")).unwrap();
        container.register_class(node("b", &["d"], "perRequest")).unwrap();
        container.register_class(node("c", &["d"], "perRequest")).unwrap();
        container.register_class(node("a", &["b", "c"], "perRequest")).unwrap();

        assert!(container.get("a").unwrap().is_some());
    }

    #[test]
    fn missing_service() {
        let container = Container::new();
        container.register_instance("database", Arc::new(())).unwrap();

        match container.get("databse") {
            Err(ContainerError::ServiceNotFound(err)) => {
                assert_eq!(err.requested, "databse");
                assert_eq!(err.required_by, None);
                assert_eq!(err.suggestions, vec!["database"]);
            }
            other => panic!("Expected ServiceNotFound, got: {other:?}"),
        }
        assert!(container.get("databse?").unwrap().is_none());
    }

    #[test]
    fn missing_dependency_names_its_consumer() {
        let container = Container::new();
        container.register_class(node("users", &["db"], "perRequest")).unwrap();

        match container.get("users") {
            Err(ContainerError::ServiceNotFound(err)) => {
                assert_eq!(err.requested, "db");
                assert_eq!(err.required_by.as_deref(), Some("users"));
            }
            other => panic!("Expected ServiceNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn optional_dependency_leaves_empty_slot() {
        let container = Container::new();
        container.register_class(node("users", &["cache?", "app"], "perRequest")).unwrap();

        let users = get_node(&container, "users");
        assert!(users.args[0].is_none());
        assert!(users.args[1].is_some());
    }

    #[test]
    fn class_replaces_instance() {
        let container = Container::new();
        container.register_instance("x", Arc::new(1u8)).unwrap();
        container.register_class(node("x", &[], "perRequest")).unwrap();

        assert!(container.require::<Node>("x").is_ok());
        assert!(matches!(
            container.require::<u8>("x"),
            Err(ContainerError::TypeMismatch { .. })
        ));
        assert_eq!(container.names(), vec!["app", "x"]);
    }

    #[test]
    fn concurrent_first_resolutions_share_one_singleton() {
        use std::sync::Barrier;
        use std::thread;

        let barrier = Arc::new(Barrier::new(2));
        let container = Container::new();
        container
            .register_class(ServiceDef::new("db").lifecycle("singleton").build({
                let barrier = barrier.clone();
                move |_| {
                    // Both callers are constructing before either caches.
                    barrier.wait();
                    Ok(instance(Node { args: Vec::new() }))
                }
            }))
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let container = container.clone();
                thread::spawn(move || get_node(&container, "db"))
            })
            .collect();
        let resolved: Vec<Arc<Node>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let later = get_node(&container, "db");
        assert!(Arc::ptr_eq(&resolved[0], &resolved[1]));
        assert!(Arc::ptr_eq(&resolved[0], &later));
    }

    #[test]
    fn reregistration_drops_cached_singleton() {
        let container = Container::new();
        container.register_class(node("db", &[], "singleton")).unwrap();
        let before = get_node(&container, "db");

        container.register_class(node("db", &[], "singleton")).unwrap();
        let after = get_node(&container, "db");
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn invalid_lifecycle_fails_lazily() {
        let constructed = Arc::new(AtomicBool::new(false));
        let container = Container::new();
        let class = ServiceDef::new("cache").lifecycle("forever").build({
            let constructed = constructed.clone();
            move |_| {
                constructed.store(true, Ordering::SeqCst);
                Ok(instance(()))
            }
        });

        // Accepted at registration time.
        container.register_class(class).unwrap();
        assert!(container.has("cache"));

        match container.get("cache") {
            Err(ContainerError::InvalidLifecycle { name, value }) => {
                assert_eq!(name, "cache");
                assert_eq!(value, "forever");
            }
            other => panic!("Expected InvalidLifecycle, got: {other:?}"),
        }
        assert!(!constructed.load(Ordering::SeqCst));
    }

    #[test]
    fn extra_args_follow_dependencies() {
        let container = Container::new();
        container.register_instance("config", Arc::new(String::from("cfg"))).unwrap();
        container
            .register_class(
                ServiceDef::new("greeter")
                    .requires(["config"])
                    .build(|args| {
                        let config = args.get::<String>(0)?;
                        let who = args.get::<&'static str>(1)?;
                        Ok(instance(format!("{config}:{who}")))
                    }),
            )
            .unwrap();

        let greeting = container
            .get_with("greeter", vec![instance("world")])
            .unwrap()
            .unwrap()
            .downcast::<String>()
            .unwrap();
        assert_eq!(greeting.as_str(), "cfg:world");
    }

    #[test]
    fn failed_construction_can_be_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        container
            .register_class(ServiceDef::new("flaky").lifecycle("singleton").build({
                let attempts = attempts.clone();
                move |_| {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("connection refused".into())
                    } else {
                        Ok(instance(7u8))
                    }
                }
            }))
            .unwrap();

        match container.get("flaky") {
            Err(ContainerError::ConstructionFailed { name, source }) => {
                assert_eq!(name, "flaky");
                assert!(source.to_string().contains("refused"));
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
        assert!(container.has("flaky"));
        assert_eq!(*container.require::<u8>("flaky").unwrap(), 7);
    }

    #[test]
    fn constructor_may_call_back_into_container() {
        let container = Container::new();
        container.register_instance("port", Arc::new(8080u16)).unwrap();
        container
            .register_class(ServiceDef::new("server").requires(["app"]).build(|args| {
                let app = args.get::<ContainerRef>(0)?;
                let container = app.upgrade().ok_or("container dropped")?;
                let port: Arc<u16> = container.require("port")?;
                Ok(instance(*port))
            }))
            .unwrap();

        assert_eq!(*container.require::<u16>("server").unwrap(), 8080);
    }

    #[test]
    fn search_matches_whole_names_in_order() {
        let container = Container::new();
        for name in ["modules.users", "db", "modules.billing", "modules"] {
            container.register_instance(name, Arc::new(())).unwrap();
        }

        assert_eq!(
            container.search("modules.*").unwrap(),
            vec!["modules.users", "modules.billing", "modules"]
        );
        assert_eq!(
            container.search(r"modules\..+").unwrap(),
            vec!["modules.users", "modules.billing"]
        );
        assert!(container.search("db").unwrap() == vec!["db"]);
        assert!(matches!(
            container.search("modules.("),
            Err(ContainerError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn has_ignores_optional_suffix() {
        let container = Container::new();
        container.register_instance("db", Arc::new(())).unwrap();
        assert!(container.has("db"));
        assert!(container.has("db?"));
        assert!(!container.has("cache"));
    }

    #[test]
    fn inspection_helpers() {
        let container = Container::new();
        container
            .register_class_from(node("users", &["db", "cache?"], "perRequest"), "/srv/users.rs")
            .unwrap();

        assert_eq!(
            container.dependencies_of("users"),
            Some(vec!["db".to_string(), "cache?".to_string()])
        );
        assert_eq!(container.source_of("users"), Some(PathBuf::from("/srv/users.rs")));
        assert_eq!(container.dependencies_of("missing"), None);
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn debug_display() {
        let container = Container::new();
        container.register_instance("x", Arc::new(1i32)).unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("2"));
    }
}
