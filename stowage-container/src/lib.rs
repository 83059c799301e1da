//! Core container implementation for Stowage.
//!
//! Services are registered by name and resolved together with their
//! dependency graph. [`discovery`] populates a container from source roots,
//! either by walking them or by replaying a persisted index.

pub mod class;
pub mod container;
mod context;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod name;
mod registry;

pub use class::{Args, Instance, ServiceClass, ServiceDef, instance};
pub use container::{Container, ContainerRef, prelude};
pub use error::{BoxError, ContainerError, Result};
pub use lifecycle::Lifecycle;

#[doc(hidden)]
pub use inventory;
