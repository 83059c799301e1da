//! Module loaders — turning a discovered file into a service class.
//!
//! Discovery hands every file it visits to a [`ModuleLoader`]. The loader
//! either returns the class that file defines, `Ok(None)` when the file is
//! not a service module, or an error when loading failed.
//!
//! [`CatalogLoader`] is the built-in loader. Service crates submit a
//! [`ServiceModule`] per source file through `inventory`, and the catalog
//! matches discovered paths against those source paths:
//!
//! ```rust,ignore
//! fn mailer() -> Result<Arc<dyn ServiceClass>, BoxError> {
//!     Ok(Arc::new(MailerClass))
//! }
//!
//! inventory::submit! {
//!     ServiceModule::new(file!(), mailer)
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::class::ServiceClass;
use crate::error::BoxError;

/// Outcome of loading one file.
pub type LoadResult = Result<Option<Arc<dyn ServiceClass>>, BoxError>;

/// Function that materializes the class of one service module.
pub type ModuleFn = fn() -> Result<Arc<dyn ServiceClass>, BoxError>;

/// Loads the service class defined by a source file.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadResult;
}

impl<F> ModuleLoader for F
where
    F: Fn(&Path) -> LoadResult + Send + Sync,
{
    fn load(&self, path: &Path) -> LoadResult {
        self(path)
    }
}

/// Compile-time registration of a service module's source file.
pub struct ServiceModule {
    /// Source path as produced by `file!()`.
    pub source: &'static str,
    pub load: ModuleFn,
}

impl ServiceModule {
    pub const fn new(source: &'static str, load: ModuleFn) -> Self {
        Self { source, load }
    }
}

inventory::collect!(ServiceModule);

/// Loader backed by a table of source paths.
///
/// A discovered path matches an entry when it ends with the entry's source
/// path, compared by components. The longest matching source wins.
#[derive(Clone, Default)]
pub struct CatalogLoader {
    modules: Vec<(PathBuf, ModuleFn)>,
}

impl CatalogLoader {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every [`ServiceModule`] submitted through `inventory`.
    pub fn from_inventory() -> Self {
        let mut catalog = Self::new();
        for module in inventory::iter::<ServiceModule> {
            catalog.modules.push((PathBuf::from(module.source), module.load));
        }
        trace!(modules = catalog.modules.len(), "Collected service modules");
        catalog
    }

    /// Adds one entry.
    pub fn with_module(mut self, source: impl Into<PathBuf>, load: ModuleFn) -> Self {
        self.modules.push((source.into(), load));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn find(&self, path: &Path) -> Option<ModuleFn> {
        self.modules
            .iter()
            .filter(|(source, _)| path.ends_with(source))
            .max_by_key(|(source, _)| source.components().count())
            .map(|(_, load)| *load)
    }
}

impl ModuleLoader for CatalogLoader {
    fn load(&self, path: &Path) -> LoadResult {
        match self.find(path) {
            Some(load) => load().map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for CatalogLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|(source, _)| source))
            .finish()
    }
}
