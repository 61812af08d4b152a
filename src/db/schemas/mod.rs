//! Database schemas for Chorus
//!
//! Defines the document structures for identities, posts and notifications,
//! and the public projections returned over HTTP.

mod metadata;
mod notification;
mod post;
mod user;

pub use metadata::Metadata;
pub use notification::{
    NotificationActor, NotificationDoc, NotificationKind, NotificationView,
    NOTIFICATION_COLLECTION,
};
pub use post::{CommentDoc, CommentView, PostDoc, PostView, POST_COLLECTION};
pub use user::{PublicUser, UserDoc, USER_COLLECTION};

/// Convert a list of ObjectIds to their hex form for JSON output
pub(crate) fn hex_ids(ids: &[bson::oid::ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}
