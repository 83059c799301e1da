//! # Stowage — a named-service container for Rust
//!
//! Register services by name, declare what they depend on and how long they
//! live, and let the container build the graph on demand. Discovery fills a
//! container from source roots and caches the result as a JSON index so the
//! next start skips the walk.
//!
//! ```rust
//! use std::sync::Arc;
//! use stowage::prelude::*;
//!
//! struct Mailer { from: String }
//!
//! let container = Container::new();
//! container.register_instance("sender", Arc::new(String::from("noreply@example.com")))?;
//! container.register_class(
//!     ServiceDef::new("mailer")
//!         .requires(["sender", "transport?"])
//!         .build(|args| {
//!             let from = args.get::<String>(0)?;
//!             Ok(instance(Mailer { from: from.to_string() }))
//!         }),
//! )?;
//!
//! let mailer: Arc<Mailer> = container.require("mailer")?;
//! assert_eq!(mailer.from, "noreply@example.com");
//! # Ok::<(), ContainerError>(())
//! ```

pub use stowage_container::*;
pub use stowage_support::*;
