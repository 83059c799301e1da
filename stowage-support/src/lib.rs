//! # Stowage Support
//!
//! Shared helpers for the Stowage service container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Name matching used for "did you mean?" hints

pub mod rendering;
