//! Document database layer
//!
//! MongoDB client wrapper plus the document schemas shared by every store
//! backend.

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
