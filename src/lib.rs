//! Chorus - social network backend
//!
//! Identities, a follow graph, posts with likes and comments, and the
//! notifications those actions fan out, served as a JSON HTTP API.
//!
//! ## Layers
//!
//! - **routes**: HTTP adapters, one module per resource
//! - **services**: business rules (validation, ownership, projections)
//! - **store**: `SocialStore` persistence seam (MongoDB or in-memory)
//! - **auth**: password hashing, session tokens, request gate
//! - **assets**: external image host

pub mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ChorusError, Result};
