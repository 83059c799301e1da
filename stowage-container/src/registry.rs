//! Service descriptor store.
//!
//! The registry maps service names to [`Descriptor`]s and remembers the
//! order names were first registered in. Re-registering a name replaces its
//! descriptor in place and keeps its position.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::class::{Instance, ServiceClass};
use crate::discovery::loader::ModuleLoader;

/// How a descriptor produces its service.
#[derive(Clone)]
pub(crate) enum Binding {
    /// A literal instance registered by the application.
    Instance(Instance),
    /// A loaded class, with its singleton instance once one was built.
    Class {
        class: Arc<dyn ServiceClass>,
        cached: Option<Instance>,
    },
    /// Known from a persisted index only. The class is loaded from the
    /// descriptor's source on first resolution.
    Indexed {
        requires: Vec<String>,
        loader: Arc<dyn ModuleLoader>,
    },
}

impl Binding {
    fn kind(&self) -> &'static str {
        match self {
            Binding::Instance(_) => "instance",
            Binding::Class { .. } => "class",
            Binding::Indexed { .. } => "indexed",
        }
    }
}

/// Registration entry for a single service.
#[derive(Clone)]
pub(crate) struct Descriptor {
    pub name: String,
    pub binding: Binding,
    /// Set only for services found by discovery.
    pub source: Option<PathBuf>,
}

impl Descriptor {
    pub fn instance(name: String, instance: Instance) -> Self {
        Self { name, binding: Binding::Instance(instance), source: None }
    }

    pub fn class(name: String, class: Arc<dyn ServiceClass>, source: Option<PathBuf>) -> Self {
        Self {
            name,
            binding: Binding::Class { class, cached: None },
            source,
        }
    }

    pub fn indexed(
        name: String,
        source: PathBuf,
        requires: Vec<String>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            name,
            binding: Binding::Indexed { requires, loader },
            source: Some(source),
        }
    }

    /// Declared dependency names, in call order.
    pub fn dependencies(&self) -> Vec<String> {
        match &self.binding {
            Binding::Instance(_) => Vec::new(),
            Binding::Class { class, .. } => class.requires(),
            Binding::Indexed { requires, .. } => requires.clone(),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("kind", &self.binding.kind())
            .field("source", &self.source)
            .finish()
    }
}

/// What the resolver has to do for a name, captured under the read lock.
pub(crate) enum Plan {
    /// A literal instance or a cached singleton.
    Ready(Instance),
    /// Nothing cached; the service must be built.
    Build(Recipe),
}

/// How to obtain the class for a service that must be built.
pub(crate) enum Recipe {
    /// The class is already loaded.
    Loaded(Arc<dyn ServiceClass>),
    /// Load the class from `source` first.
    Indexed {
        source: PathBuf,
        requires: Vec<String>,
        loader: Arc<dyn ModuleLoader>,
    },
}

/// Stores all service descriptors.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    descriptors: HashMap<String, Descriptor>,
    order: Vec<String>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the descriptor for `descriptor.name`.
    pub fn insert(&mut self, descriptor: Descriptor) {
        let name = descriptor.name.clone();
        debug!(
            service = %name,
            kind = descriptor.binding.kind(),
            source = ?descriptor.source,
            "Registered service"
        );
        if self.descriptors.insert(name.clone(), descriptor).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Names in first-registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Captures what resolving `name` requires, without running any code.
    pub fn plan(&self, name: &str) -> Option<Plan> {
        let descriptor = self.descriptors.get(name)?;
        let plan = match &descriptor.binding {
            Binding::Instance(instance) => Plan::Ready(Arc::clone(instance)),
            Binding::Class { cached: Some(instance), .. } => Plan::Ready(Arc::clone(instance)),
            Binding::Class { class, cached: None } => {
                Plan::Build(Recipe::Loaded(Arc::clone(class)))
            }
            Binding::Indexed { requires, loader } => Plan::Build(Recipe::Indexed {
                // Indexed descriptors are always created with a source.
                source: descriptor.source.clone().unwrap_or_default(),
                requires: requires.clone(),
                loader: Arc::clone(loader),
            }),
        };
        Some(plan)
    }

    /// Moves an index-only descriptor to the loaded state.
    ///
    /// Does nothing if `name` was re-registered while the module loaded.
    pub fn complete_load(
        &mut self,
        name: &str,
        source: &Path,
        class: Arc<dyn ServiceClass>,
    ) -> bool {
        match self.descriptors.get_mut(name) {
            Some(descriptor)
                if matches!(descriptor.binding, Binding::Indexed { .. })
                    && descriptor.source.as_deref() == Some(source) =>
            {
                trace!(service = %name, source = %source.display(), "Loaded indexed service");
                descriptor.binding = Binding::Class { class, cached: None };
                true
            }
            _ => false,
        }
    }

    /// Caches a singleton on its descriptor and returns the instance callers
    /// should share.
    ///
    /// A singleton cached meanwhile by a concurrent resolution wins over
    /// `instance`. Nothing is cached if the descriptor no longer holds the
    /// class that built `instance`.
    pub fn cache_singleton(
        &mut self,
        name: &str,
        built_by: &Arc<dyn ServiceClass>,
        instance: Instance,
    ) -> Instance {
        match self.descriptors.get_mut(name).map(|d| &mut d.binding) {
            Some(Binding::Class { class, cached }) if Arc::ptr_eq(class, built_by) => match cached {
                Some(winner) => {
                    trace!(service = %name, "Singleton already cached, dropping duplicate");
                    Arc::clone(winner)
                }
                None => {
                    trace!(service = %name, "Cached singleton");
                    *cached = Some(Arc::clone(&instance));
                    instance
                }
            },
            _ => instance,
        }
    }
}
