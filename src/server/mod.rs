//! # Web Server
//!
//! HTTP layer of the CMS: sessions, request guards, form parsing, themes and the
//! handlers behind every route.
//!
//! ## Request flow
//! 1. [`session::session_layer`] attaches the visitor's [`session::Session`]
//! 2. The handler runs its guard chain from [`guards`]
//! 3. The handler answers with a [`reply::Reply`] or a [`reply::Rejection`]

pub mod form;
pub mod guards;
pub mod handlers;
pub mod reply;
pub mod router;
pub mod session;
pub mod state;
pub mod themes;

pub use router::build_router;
pub use state::AppState;
