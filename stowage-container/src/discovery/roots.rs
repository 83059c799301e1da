//! Discovery root syntax.
//!
//! Roots come from configuration as plain strings:
//! - `!services` — relative to the framework's own package directory
//! - `/srv/app/services` — absolute
//! - `services` — relative to the application's base directory

use std::fmt;
use std::path::{Path, PathBuf};

/// A parsed discovery root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSpec {
    Framework(PathBuf),
    Absolute(PathBuf),
    Application(PathBuf),
}

impl RootSpec {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix('!') {
            RootSpec::Framework(PathBuf::from(rest.trim_start_matches('/')))
        } else if raw.starts_with('/') || Path::new(raw).is_absolute() {
            RootSpec::Absolute(PathBuf::from(raw))
        } else {
            RootSpec::Application(PathBuf::from(raw))
        }
    }

    /// The directory this root names.
    pub fn resolve(&self, base_dir: &Path, framework_dir: &Path) -> PathBuf {
        match self {
            RootSpec::Framework(rel) => framework_dir.join(rel),
            RootSpec::Absolute(path) => path.clone(),
            RootSpec::Application(rel) => base_dir.join(rel),
        }
    }
}

impl fmt::Display for RootSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSpec::Framework(rel) => write!(f, "!{}", rel.display()),
            RootSpec::Absolute(path) | RootSpec::Application(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}
