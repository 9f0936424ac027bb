//! # One-Page CMS
//!
//! A single-tenant content management server for a one-page website with
//! portfolios and pictures.
//!
//! ## Modules
//! - [`common`]: configuration, errors and field validation
//! - [`store`]: SQLite persistence of users, sites, portfolios and pictures
//! - [`processing`]: image upload and resize pipeline
//! - [`mail`]: outgoing email over SMTP
//! - [`server`]: HTTP routes, sessions and request guards

pub mod common;
pub mod mail;
pub mod processing;
pub mod server;
pub mod store;

pub use common::{CmsError, Result};
pub use server::{build_router, AppState};
