//! Error types for Stowage container operations.
//!
//! Every failure is reported synchronously to the caller of `get`,
//! `register_*` or a discovery pass. Nothing is retried.

use std::fmt;
use std::path::PathBuf;

use stowage_support::rendering::render_chain;

/// Boxed error returned by constructors and module loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Stowage operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Registration without a usable name.
    #[error("{}", .0)]
    InvalidName(InvalidNameError),

    /// A mandatory lookup named a service that was never registered.
    #[error("{}", .0)]
    ServiceNotFound(ServiceNotFoundError),

    /// A service was reached again while its own resolution was in progress.
    #[error("{}", .0)]
    CyclicDependency(CyclicDependencyError),

    /// The descriptor declares a lifecycle outside the recognized set.
    #[error("Invalid lifecycle {value:?} for service {name:?}\n  Hint: Use one of \"perRequest\", \"singleton\", \"unique\"")]
    InvalidLifecycle { name: String, value: String },

    /// The persisted index points at a file that no longer provides the
    /// indexed name.
    #[error("{}", .0)]
    StaleIndex(StaleIndexError),

    /// A constructor returned an error.
    #[error("Failed to construct {name:?}: {source}")]
    ConstructionFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// A module failed to load, during discovery or on first resolution.
    #[error("Failed to load service module {}: {source}", .path.display())]
    ModuleLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Walking a discovery root failed.
    #[error("Failed to walk discovery root {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Writing the persisted index failed.
    #[error("Failed to write service index {}: {source}", .path.display())]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `search` received a pattern that is not a valid regular expression.
    #[error("Invalid search pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A resolved value could not be downcast to the requested type.
    #[error("Service {name:?} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// The blocking discovery task panicked or was cancelled.
    #[cfg(feature = "async")]
    #[error("Discovery task failed: {0}")]
    DiscoveryTask(#[from] tokio::task::JoinError),
}

/// Error when a registration has no usable name.
#[derive(Debug)]
pub struct InvalidNameError {
    /// The rejected name; empty when the class declared none.
    pub name: String,
    /// Why the name was rejected.
    pub reason: &'static str,
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid service name {:?}: {}", self.name, self.reason)
    }
}

/// Error when a mandatory service was not registered.
///
/// Includes helpful hints about what went wrong.
#[derive(Debug)]
pub struct ServiceNotFoundError {
    /// The service that was requested
    pub requested: String,
    /// The service whose dependency list named it (if any)
    pub required_by: Option<String>,
    /// Similar names that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for ServiceNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not found: {:?}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent:?}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Register it, or request {:?} if it may be absent",
            format!("{}?", self.requested)
        )
    }
}

/// Error when a cyclic dependency is detected during resolution.
#[derive(Debug)]
pub struct CyclicDependencyError {
    /// The name at which the cycle closed.
    pub name: String,
    /// The in-progress chain, ending with `name` a second time.
    /// Example: ["a", "b", "c", "a"]
    pub chain: Vec<String>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cyclic dependency detected at {:?}:\n  ", self.name)?;
        write!(f, "{}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: Remove one edge of the cycle or pass the value as an extra argument"
        )
    }
}

/// Error when an index-only descriptor loads a module providing a different
/// name.
#[derive(Debug)]
pub struct StaleIndexError {
    /// The name recorded in the index.
    pub name: String,
    /// The file the index pointed at.
    pub path: PathBuf,
    /// What the module actually provides now.
    pub found: Option<String>,
}

impl fmt::Display for StaleIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stale service index: {} was indexed as {:?}",
            self.path.display(),
            self.name
        )?;
        match self.found {
            Some(ref found) => write!(f, " but now provides {found:?}")?,
            None => write!(f, " but no longer provides a service")?,
        }
        write!(f, "\n  Hint: Delete the index file and run discovery again")
    }
}

impl ContainerError {
    /// Returns `true` for lookups of names that are not registered.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::ServiceNotFound(_))
    }

    /// Returns `true` when the cached index has drifted from the source tree.
    pub fn is_stale_index(&self) -> bool {
        matches!(self, ContainerError::StaleIndex(_))
    }
}

/// Convenient Result type for Stowage operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
