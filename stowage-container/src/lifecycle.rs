//! Service lifecycle policies.
//!
//! A lifecycle decides how long a constructed service is reused:
//! - [`Lifecycle::PerRequest`] — shared inside one top-level `get`, fresh on the next
//! - [`Lifecycle::Singleton`] — constructed once, cached for the container's lifetime
//! - [`Lifecycle::Unique`] — fresh on every reference, even inside one `get`
//!
//! Classes declare their lifecycle as a plain string. It is parsed when the
//! service is resolved, not when it is registered, so a bad value only fails
//! the lookups that actually need that service.
use std::fmt;
use std::str::FromStr;

/// Defines how a resolved service is shared.
///
/// # Examples
/// ```
/// use stowage_container::lifecycle::Lifecycle;
///
/// assert_eq!("singleton".parse::<Lifecycle>(), Ok(Lifecycle::Singleton));
/// assert!("forever".parse::<Lifecycle>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// One instance per top-level resolution.
    ///
    /// Sibling consumers within the same `get` call share it; the next `get`
    /// builds a new one.
    #[default]
    PerRequest,

    /// One instance for the lifetime of the container.
    ///
    /// Cached on the descriptor after the first construction and never
    /// released by the container.
    Singleton,

    /// A new instance for every reference.
    ///
    /// Never shared, not even between siblings of one resolution.
    Unique,
}

impl Lifecycle {
    /// Declared value when a class does not override it.
    pub const DEFAULT_NAME: &'static str = "perRequest";

    /// The declared spelling of this lifecycle.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::PerRequest => "perRequest",
            Lifecycle::Singleton => "singleton",
            Lifecycle::Unique => "unique",
        }
    }
}

/// Returned when a declared lifecycle is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLifecycle(pub String);

impl fmt::Display for UnknownLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lifecycle {:?}", self.0)
    }
}

impl std::error::Error for UnknownLifecycle {}

impl FromStr for Lifecycle {
    type Err = UnknownLifecycle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perRequest" => Ok(Lifecycle::PerRequest),
            "singleton" => Ok(Lifecycle::Singleton),
            "unique" => Ok(Lifecycle::Unique),
            other => Err(UnknownLifecycle(other.to_string())),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
