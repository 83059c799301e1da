//! Service name lookups.
//!
//! A [`Lookup`] is a requested service name with the optional `?` suffix
//! already split off. Stored names never carry the suffix.

use std::fmt;

use crate::error::{ContainerError, InvalidNameError, Result};

/// Suffix marking a lookup as optional.
pub const OPTIONAL_SUFFIX: char = '?';

/// A parsed service lookup.
///
/// # Examples
/// ```
/// use stowage_container::name::Lookup;
///
/// let lookup = Lookup::parse("mailer?");
/// assert_eq!(lookup.name(), "mailer");
/// assert!(lookup.is_optional());
///
/// let lookup = Lookup::parse("db");
/// assert!(!lookup.is_optional());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup<'a> {
    name: &'a str,
    optional: bool,
}

impl<'a> Lookup<'a> {
    /// Splits a trailing `?` off `requested`.
    #[inline]
    pub fn parse(requested: &'a str) -> Self {
        match requested.strip_suffix(OPTIONAL_SUFFIX) {
            Some(name) => Self { name, optional: true },
            None => Self { name: requested, optional: false },
        }
    }

    /// The stored name to look up.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Whether "not found" yields an absent value instead of an error.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl fmt::Display for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}{}", self.name, OPTIONAL_SUFFIX)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Checks that `name` can be stored as a registration key.
pub(crate) fn validate(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name.ends_with(OPTIONAL_SUFFIX) {
        "the trailing '?' is reserved for optional lookups"
    } else {
        return Ok(());
    };

    Err(ContainerError::InvalidName(InvalidNameError {
        name: name.to_string(),
        reason,
    }))
}
