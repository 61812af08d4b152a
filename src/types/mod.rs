//! Shared types for Chorus

pub mod error;

pub use error::{ChorusError, Result};
