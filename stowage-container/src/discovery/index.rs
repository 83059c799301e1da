//! Persisted service index.
//!
//! After a cold discovery the wiring metadata is written as JSON:
//!
//! ```json
//! { "version": "1.4.0",
//!   "services": [ { "filename": "/srv/app/services/db.rs", "provides": "db", "requires": [] } ] }
//! ```
//!
//! At the next start the index replaces the filesystem walk, as long as its
//! version matches the running application. An index that cannot be read,
//! does not parse, or has a malformed or unusably named record is treated
//! as absent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ContainerError, Result};
use crate::name;

/// One discovered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// File the service was discovered in.
    pub filename: PathBuf,
    /// Name the service is registered under.
    pub provides: String,
    /// Declared dependency names, in call order.
    pub requires: Vec<String>,
}

/// The persisted index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIndex {
    pub version: String,
    pub services: Vec<IndexRecord>,
}

impl ServiceIndex {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            services: Vec::new(),
        }
    }

    pub fn push(&mut self, record: IndexRecord) {
        self.services.push(record);
    }

    /// Reads the index at `path` if it exists, parses and matches `version`.
    pub fn load(path: &Path, version: &str) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No service index");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable service index");
                return None;
            }
        };

        let index: ServiceIndex = match serde_json::from_str(&content) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed service index");
                return None;
            }
        };

        if index.version != version {
            warn!(
                path = %path.display(),
                indexed = %index.version,
                running = %version,
                "Ignoring service index from another version"
            );
            return None;
        }

        if let Some(err) = index.services.iter().find_map(|r| name::validate(&r.provides).err()) {
            warn!(
                path = %path.display(),
                error = %err,
                "Ignoring service index with an invalid name"
            );
            return None;
        }

        debug!(path = %path.display(), services = index.services.len(), "Loaded service index");
        Some(index)
    }

    /// Writes the index as pretty JSON, creating parent directories.
    ///
    /// The document goes to a sibling temporary file first and is renamed
    /// over `path`, so readers never see a partial index.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.write(path).map_err(|source| ContainerError::IndexWrite {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), services = self.services.len(), "Wrote service index");
        Ok(())
    }

    fn write(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, json)?;
        fs::rename(&staging, path)
    }
}
