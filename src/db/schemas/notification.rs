//! Notification document schema
//!
//! Created as a side effect of a follow or a like; read and deleted by the
//! identity it is addressed to.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::UserDoc;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for notifications
pub const NOTIFICATION_COLLECTION: &str = "notifications";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
}

/// Notification document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NotificationDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    /// Acting identity
    pub from: ObjectId,

    /// Addressee
    pub to: ObjectId,

    #[serde(default)]
    pub read: bool,
}

impl NotificationDoc {
    pub fn new(kind: NotificationKind, from: ObjectId, to: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            metadata: Metadata::new(),
            kind,
            from,
            to,
            read: false,
        }
    }

    /// Notification for `actor` liking a post owned by `owner`.
    /// Liking your own post notifies nobody.
    pub fn for_like(actor: ObjectId, owner: ObjectId) -> Option<Self> {
        (actor != owner).then(|| Self::new(NotificationKind::Like, actor, owner))
    }

    pub fn to_view(&self, actors: &HashMap<ObjectId, NotificationActor>) -> NotificationView {
        NotificationView {
            id: self.id.to_hex(),
            kind: self.kind,
            from: actors.get(&self.from).cloned(),
            to: self.to.to_hex(),
            read: self.read,
            created_at: self.metadata.created(),
        }
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "to": 1, "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("to_recent".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for NotificationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// The acting identity as shown on a notification
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationActor {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub profile_img: String,
}

impl From<&UserDoc> for NotificationActor {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username.clone(),
            profile_img: user.profile_img.clone(),
        }
    }
}

/// Notification as seen by clients
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from: Option<NotificationActor>,
    pub to: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_like_has_no_notification() {
        let id = ObjectId::new();
        assert!(NotificationDoc::for_like(id, id).is_none());

        let other = ObjectId::new();
        let n = NotificationDoc::for_like(id, other).unwrap();
        assert_eq!(n.kind, NotificationKind::Like);
        assert_eq!((n.from, n.to), (id, other));
        assert!(!n.read);
    }

    #[test]
    fn test_kind_serializes_as_type_tag() {
        let n = NotificationDoc::new(NotificationKind::Follow, ObjectId::new(), ObjectId::new());
        let raw = bson::to_document(&n).unwrap();
        assert_eq!(raw.get_str("type").unwrap(), "follow");

        let view = serde_json::to_value(n.to_view(&HashMap::new())).unwrap();
        assert_eq!(view["type"], "follow");
        assert!(view["from"].is_null());
    }
}
