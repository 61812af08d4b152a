//! Common metadata for all documents
//!
//! Tracks creation and update timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamp
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(DateTime::now());
    }

    pub fn created(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.created_at.map(|d| d.to_chrono())
    }

    pub fn updated(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.updated_at.map(|d| d.to_chrono())
    }
}
