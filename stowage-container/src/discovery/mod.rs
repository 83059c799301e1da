//! Service discovery.
//!
//! Populates a [`Container`] from source roots in one of two modes:
//! - **Cold**: walk every root depth-first in file-name order, load each file
//!   through the [`ModuleLoader`], register what it provides, then persist
//!   the wiring as a [`ServiceIndex`].
//! - **Replay**: when a persisted index matches the running version, register
//!   index-only descriptors straight from it. No file is walked or loaded;
//!   each class is loaded on its first resolution.
//!
//! The walk is strictly sequential so registration order (and any side
//! effects of loading) is the same on every run. A module that fails to load
//! aborts the whole pass before anything is registered.

pub mod index;
pub mod loader;
pub mod roots;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, trace};
use walkdir::WalkDir;

use crate::class::ServiceClass;
use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::name;

use self::index::{IndexRecord, ServiceIndex};
use self::loader::ModuleLoader;
use self::roots::RootSpec;

/// Discovery settings, usually embedded in the application's config file.
///
/// ```rust
/// use stowage_container::discovery::DiscoveryConfig;
///
/// let config: DiscoveryConfig = serde_json::from_str(r#"{
///     "roots": ["services", "!builtin"],
///     "base_dir": "/srv/app",
///     "index_path": "/srv/app/.cache/services.json",
///     "version": "1.4.0"
/// }"#).unwrap();
/// assert_eq!(config.roots.len(), 2);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Roots in `!framework`, `/absolute` or `relative` syntax.
    pub roots: Vec<String>,
    /// Directory relative roots are resolved against.
    #[serde(default)]
    pub base_dir: PathBuf,
    /// Directory `!` roots are resolved against. Defaults to this crate's
    /// package directory.
    #[serde(default)]
    pub framework_dir: Option<PathBuf>,
    /// Where the index is read from and written to. No caching when unset.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    /// Application version stamped into the index.
    pub version: String,
}

impl DiscoveryConfig {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            roots: Vec::new(),
            base_dir: PathBuf::new(),
            framework_dir: None,
            index_path: None,
            version: version.into(),
        }
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn framework_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.framework_dir = Some(dir.into());
        self
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Roots as absolute directories, in configured order.
    pub fn resolved_roots(&self) -> Vec<PathBuf> {
        let framework_dir = self
            .framework_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

        self.roots
            .iter()
            .map(|raw| RootSpec::parse(raw).resolve(&self.base_dir, &framework_dir))
            .map(|root| std::path::absolute(&root).unwrap_or(root))
            .collect()
    }
}

/// How a discovery pass populated the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Roots were walked and every module loaded.
    Cold,
    /// The persisted index was replayed.
    Replayed,
}

/// Result of a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub mode: DiscoveryMode,
    /// Registered names in registration order.
    pub services: Vec<String>,
}

/// Runs discovery for one configuration and loader.
#[derive(Clone)]
pub struct Discovery {
    config: DiscoveryConfig,
    loader: Arc<dyn ModuleLoader>,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig, loader: Arc<dyn ModuleLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Populates `container`, replaying the index when it is usable and
    /// walking the roots otherwise.
    ///
    /// A cold walk loads every module before registering any of them, so a
    /// failed pass leaves `container` as it was.
    ///
    /// # Errors
    /// - [`ContainerError::Walk`] — a root is missing or unreadable
    /// - [`ContainerError::ModuleLoad`] — a module failed to load
    /// - [`ContainerError::InvalidName`] — a module or index record provides
    ///   an unusable name
    /// - [`ContainerError::IndexWrite`] — the new index could not be written
    #[instrument(skip_all, name = "service_discovery", fields(version = %self.config.version))]
    pub fn run(&self, container: &Container) -> Result<DiscoveryReport> {
        let cached = self
            .config
            .index_path
            .as_deref()
            .and_then(|path| ServiceIndex::load(path, &self.config.version));

        let report = match cached {
            Some(index) => self.replay(container, index)?,
            None => {
                let found = self.walk()?;
                let index = self.register(container, found)?;
                if let Some(path) = &self.config.index_path {
                    index.save(path)?;
                }
                DiscoveryReport {
                    mode: DiscoveryMode::Cold,
                    services: index.services.into_iter().map(|r| r.provides).collect(),
                }
            }
        };

        info!(
            mode = ?report.mode,
            services = report.services.len(),
            "Service discovery finished"
        );
        Ok(report)
    }

    /// Runs [`run`](Self::run) on a blocking task.
    ///
    /// The walk itself stays sequential; this only keeps it off the async
    /// executor's worker threads.
    #[cfg(feature = "async")]
    pub async fn run_async(&self, container: &Container) -> Result<DiscoveryReport> {
        let discovery = self.clone();
        let container = container.clone();
        tokio::task::spawn_blocking(move || discovery.run(&container)).await?
    }

    fn replay(&self, container: &Container, index: ServiceIndex) -> Result<DiscoveryReport> {
        let mut services = Vec::with_capacity(index.services.len());
        for record in index.services {
            container.register_indexed(
                &record.provides,
                record.filename,
                record.requires,
                Arc::clone(&self.loader),
            )?;
            services.push(record.provides);
        }
        Ok(DiscoveryReport {
            mode: DiscoveryMode::Replayed,
            services,
        })
    }

    fn walk(&self) -> Result<Vec<(PathBuf, Arc<dyn ServiceClass>)>> {
        let mut found = Vec::new();
        for root in self.config.resolved_roots() {
            trace!(root = %root.display(), "Walking discovery root");
            for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
                let entry = entry.map_err(|source| ContainerError::Walk {
                    root: root.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(class) = self.visit(entry.path())? {
                    found.push((entry.into_path(), class));
                }
            }
        }
        Ok(found)
    }

    fn visit(&self, path: &Path) -> Result<Option<Arc<dyn ServiceClass>>> {
        let loaded = self
            .loader
            .load(path)
            .map_err(|source| ContainerError::ModuleLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let Some(class) = loaded else {
            return Ok(None);
        };
        match class.provides() {
            None => {
                trace!(path = %path.display(), "Module provides no service");
                Ok(None)
            }
            Some(provides) => {
                name::validate(provides)?;
                Ok(Some(class))
            }
        }
    }

    fn register(
        &self,
        container: &Container,
        found: Vec<(PathBuf, Arc<dyn ServiceClass>)>,
    ) -> Result<ServiceIndex> {
        let mut index = ServiceIndex::new(self.config.version.clone());
        for (path, class) in found {
            let requires = class.requires();
            let provides = container.register_class_from(class, &path)?;
            index.push(IndexRecord {
                filename: path,
                provides,
                requires,
            });
        }
        Ok(index)
    }
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
