//! Credential and content store
//!
//! `SocialStore` is the seam between the services and persistence. Every
//! mutation that touches more than one document (follow edges, likes,
//! post deletion) is a single trait call so each backend can apply it as
//! one atomic unit:
//!
//! - `MemoryStore`: one write lock held for the whole call (dev, tests)
//! - `MongoStore`: one multi-document transaction (production)

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{CommentDoc, NotificationDoc, PostDoc, UserDoc};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Result of a follow toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    Unfollowed,
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

/// Like toggle result with the post's liker set after the change
#[derive(Debug, Clone)]
pub struct LikeToggle {
    pub outcome: LikeOutcome,
    pub likes: Vec<ObjectId>,
}

/// Which posts to list. Results are always newest-first.
#[derive(Debug, Clone)]
pub enum PostQuery {
    All,
    ByAuthors(Vec<ObjectId>),
    ByIds(Vec<ObjectId>),
}

#[async_trait]
pub trait SocialStore: Send + Sync {
    /// Readiness check
    async fn ping(&self) -> Result<()>;

    // ---- identities ----

    /// Insert a new identity. Fails with `Conflict` when the username or
    /// email is already taken.
    async fn insert_user(&self, user: UserDoc) -> Result<()>;
    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;
    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>>;

    /// Persist profile fields (name, handle, email, password hash, images,
    /// bio, link). Edge and like sets are left untouched.
    async fn update_user_profile(&self, user: &UserDoc) -> Result<()>;

    /// Up to `sample` random identities whose ids are not in `excluded`
    async fn suggested_users(&self, excluded: &[ObjectId], sample: usize) -> Result<Vec<UserDoc>>;

    // ---- follow graph ----

    /// Flip the `actor -> target` edge on both identities. Creating the
    /// edge also records a follow notification for `target`.
    async fn toggle_follow(&self, actor: &ObjectId, target: &ObjectId) -> Result<FollowOutcome>;

    // ---- posts ----

    async fn insert_post(&self, post: PostDoc) -> Result<()>;
    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>>;
    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostDoc>>;

    /// Append a comment, returning the updated post (None if absent)
    async fn push_comment(&self, post: &ObjectId, comment: CommentDoc) -> Result<Option<PostDoc>>;

    /// Remove a post and drop it from every liker's `liked_posts`.
    /// Returns false when the post did not exist.
    async fn delete_post(&self, id: &ObjectId) -> Result<bool>;

    /// Flip `actor`'s like on a post, keeping the identity's `liked_posts`
    /// in step. A new like records a notification for the owner unless the
    /// owner is the actor.
    async fn toggle_like(&self, actor: &ObjectId, post: &ObjectId) -> Result<LikeToggle>;

    // ---- notifications ----

    /// Notifications addressed to `to`, newest-first, as they were before
    /// this call; all of them are marked read as a side effect.
    async fn take_notifications(&self, to: &ObjectId) -> Result<Vec<NotificationDoc>>;
    async fn find_notification(&self, id: &ObjectId) -> Result<Option<NotificationDoc>>;
    async fn delete_notification(&self, id: &ObjectId) -> Result<bool>;
    async fn delete_notifications_for(&self, to: &ObjectId) -> Result<u64>;
}
