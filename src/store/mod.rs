//! # Relational Store
//!
//! Users, the published site, portfolios and pictures, persisted in SQLite.
//!
//! ## Modules
//!
//! - [`models`]: Record types and their field validation
//! - [`database`]: Connection wrapper with the queries the handlers need
//! - [`password`]: Salted password hashing and random tokens

pub mod database;
pub mod models;
pub mod password;
mod schema;

pub use database::{run_blocking, Database, MAIN_SITE_ID};
pub use models::{
    ImageNames, ImageUrls, NewEntry, NewUser, Picture, Portfolio, Site, SiteContent, User,
};
pub use password::{hash_password, random_token, verify_password};
