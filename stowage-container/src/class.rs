//! Service classes — the recipe the container uses to build a service.
//!
//! Every registrable service implements [`ServiceClass`]. The trait carries
//! the metadata the container needs (provided name, dependency names,
//! lifecycle) and the constructor itself. Defaults for the optional parts are
//! supplied by the trait, not by the implementor.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use stowage_container::class::{instance, Args, ServiceClass, Instance};
//! use stowage_container::error::BoxError;
//!
//! struct Database { url: String }
//! struct UserRepo { db: Arc<Database> }
//!
//! struct UserRepoClass;
//!
//! impl ServiceClass for UserRepoClass {
//!     fn provides(&self) -> Option<&str> { Some("users.repo") }
//!     fn requires(&self) -> Vec<String> { vec!["db".into()] }
//!
//!     fn construct(&self, args: Args) -> Result<Instance, BoxError> {
//!         Ok(instance(UserRepo { db: args.get::<Database>(0)? }))
//!     }
//! }
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::lifecycle::Lifecycle;

/// A type-erased resolved service.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wraps a value as an [`Instance`].
#[inline]
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// A constructible service and its wiring metadata.
pub trait ServiceClass: Send + Sync {
    /// Name the service is registered under. `None` means the class is not
    /// a service and cannot be registered.
    fn provides(&self) -> Option<&str>;

    /// Names of the services passed to [`construct`](Self::construct), in
    /// call order. A trailing `?` marks a dependency as optional.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declared lifecycle. Parsed at resolution time; see
    /// [`Lifecycle`](crate::lifecycle::Lifecycle).
    fn lifecycle(&self) -> &str {
        Lifecycle::DEFAULT_NAME
    }

    /// Builds the service from its resolved dependencies followed by any
    /// extra arguments the caller supplied.
    fn construct(&self, args: Args) -> Result<Instance, BoxError>;
}

/// Errors raised when a constructor reads its arguments.
#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    /// Fewer arguments than the constructor expected.
    #[error("missing argument #{index} (got {len})")]
    Missing { index: usize, len: usize },

    /// An optional dependency resolved to nothing.
    #[error("argument #{index} is absent")]
    Absent { index: usize },

    /// The argument is a different type.
    #[error("argument #{index} is not a {expected}")]
    TypeMismatch { index: usize, expected: &'static str },
}

/// Positional constructor arguments.
///
/// Resolved dependencies come first, in the class's declared order, then the
/// caller's extra arguments. Optional dependencies that were not registered
/// are present as empty slots so positions stay stable.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Option<Instance>>,
}

impl Args {
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns argument `index` as `Arc<T>`.
    ///
    /// # Errors
    /// [`ArgError::Missing`] past the end, [`ArgError::Absent`] for an empty
    /// optional slot, [`ArgError::TypeMismatch`] for the wrong type.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgError> {
        match self.values.get(index) {
            None => Err(ArgError::Missing {
                index,
                len: self.values.len(),
            }),
            Some(None) => Err(ArgError::Absent { index }),
            Some(Some(value)) => downcast(value, index),
        }
    }

    /// Like [`get`](Self::get), but an empty or missing slot is `Ok(None)`.
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>, ArgError> {
        match self.values.get(index) {
            None | Some(None) => Ok(None),
            Some(Some(value)) => downcast(value, index).map(Some),
        }
    }

    /// Returns the raw instance at `index`, if present.
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn into_inner(self) -> Vec<Option<Instance>> {
        self.values
    }
}

fn downcast<T: Any + Send + Sync>(value: &Instance, index: usize) -> Result<Arc<T>, ArgError> {
    Arc::clone(value)
        .downcast::<T>()
        .map_err(|_| ArgError::TypeMismatch {
            index,
            expected: type_name::<T>(),
        })
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.values
                    .iter()
                    .map(|v| if v.is_some() { "<instance>" } else { "<absent>" }),
            )
            .finish()
    }
}

/// Builder for closure-backed service classes.
///
/// ```rust
/// use stowage_container::class::{instance, ServiceClass, ServiceDef};
///
/// let class = ServiceDef::new("clock")
///     .lifecycle("singleton")
///     .build(|_| Ok(instance(42u64)));
/// assert_eq!(class.provides(), Some("clock"));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDef {
    name: String,
    requires: Vec<String>,
    lifecycle: String,
}

impl ServiceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            lifecycle: Lifecycle::DEFAULT_NAME.to_string(),
        }
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn lifecycle(mut self, lifecycle: impl Into<String>) -> Self {
        self.lifecycle = lifecycle.into();
        self
    }

    /// Finishes the class with its constructor.
    pub fn build<F>(self, construct: F) -> Arc<dyn ServiceClass>
    where
        F: Fn(Args) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Arc::new(FnClass { def: self, construct })
    }
}

struct FnClass<F> {
    def: ServiceDef,
    construct: F,
}

impl<F> ServiceClass for FnClass<F>
where
    F: Fn(Args) -> Result<Instance, BoxError> + Send + Sync,
{
    fn provides(&self) -> Option<&str> {
        Some(self.def.name.as_str()).filter(|name| !name.is_empty())
    }

    fn requires(&self) -> Vec<String> {
        self.def.requires.clone()
    }

    fn lifecycle(&self) -> &str {
        &self.def.lifecycle
    }

    fn construct(&self, args: Args) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }
}
