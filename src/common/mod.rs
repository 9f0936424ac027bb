//! # Common Components
//!
//! Shared utilities and data structures used across the store, the image pipeline,
//! the mailer and the HTTP server.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration loading and the configuration tree
//! - [`error`]: Crate-wide error type
//! - [`validation`]: Regex predicates for user-supplied fields

pub mod config;
pub mod error;
pub mod validation;

pub use error::{CmsError, Result};
