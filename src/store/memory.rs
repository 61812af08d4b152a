//! In-memory store
//!
//! All collections live behind one `RwLock`. Mutating calls hold the write
//! lock for their whole duration, so every trait call is serializable and
//! multi-document updates can never be observed half-applied.

use async_trait::async_trait;
use bson::oid::ObjectId;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{FollowOutcome, LikeOutcome, LikeToggle, PostQuery, SocialStore};
use crate::db::schemas::{CommentDoc, Metadata, NotificationDoc, NotificationKind, PostDoc, UserDoc};
use crate::types::{ChorusError, Result};

#[derive(Default)]
struct MemoryState {
    users: HashMap<ObjectId, UserDoc>,
    posts: HashMap<ObjectId, PostDoc>,
    notifications: HashMap<ObjectId, NotificationDoc>,
}

impl MemoryState {
    /// Enforce the unique username/email indexes for `user`
    fn check_unique(&self, user: &UserDoc) -> Result<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(ChorusError::Conflict { field: "Username" });
            }
            if other.email == user.email {
                return Err(ChorusError::Conflict { field: "Email" });
            }
        }
        Ok(())
    }

    fn user_mut(&mut self, id: &ObjectId) -> Result<&mut UserDoc> {
        self.users.get_mut(id).ok_or(ChorusError::NotFound("User"))
    }
}

fn add_to_set(set: &mut Vec<ObjectId>, id: ObjectId) {
    if !set.contains(&id) {
        set.push(id);
    }
}

fn pull(set: &mut Vec<ObjectId>, id: &ObjectId) {
    set.retain(|x| x != id);
}

/// In-memory `SocialStore`
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        warn!("Store running in memory-only mode (data is lost on restart)");
        Self::default()
    }
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_unique(&user)?;
        // Stamped on insert, as the Mongo collection does
        user.metadata = Metadata::new();
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn update_user_profile(&self, user: &UserDoc) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_unique(user)?;
        let stored = state.user_mut(&user.id)?;

        stored.username = user.username.clone();
        stored.full_name = user.full_name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.profile_img = user.profile_img.clone();
        stored.cover_img = user.cover_img.clone();
        stored.bio = user.bio.clone();
        stored.link = user.link.clone();
        stored.metadata.touch();
        Ok(())
    }

    async fn suggested_users(&self, excluded: &[ObjectId], sample: usize) -> Result<Vec<UserDoc>> {
        let state = self.state.read().await;
        let mut candidates: Vec<UserDoc> = state
            .users
            .values()
            .filter(|u| !excluded.contains(&u.id))
            .cloned()
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(sample);
        Ok(candidates)
    }

    async fn toggle_follow(&self, actor: &ObjectId, target: &ObjectId) -> Result<FollowOutcome> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(target) {
            return Err(ChorusError::NotFound("User"));
        }

        let outcome = if state.user_mut(actor)?.is_following(target) {
            pull(&mut state.user_mut(actor)?.following, target);
            pull(&mut state.user_mut(target)?.followers, actor);
            FollowOutcome::Unfollowed
        } else {
            add_to_set(&mut state.user_mut(actor)?.following, *target);
            add_to_set(&mut state.user_mut(target)?.followers, *actor);
            let notification = NotificationDoc::new(NotificationKind::Follow, *actor, *target);
            state.notifications.insert(notification.id, notification);
            FollowOutcome::Followed
        };

        state.user_mut(actor)?.metadata.touch();
        state.user_mut(target)?.metadata.touch();
        debug!(%actor, %target, ?outcome, "Follow edge toggled");
        Ok(outcome)
    }

    async fn insert_post(&self, mut post: PostDoc) -> Result<()> {
        post.metadata = Metadata::new();
        self.state.write().await.posts.insert(post.id, post);
        Ok(())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>> {
        Ok(self.state.read().await.posts.get(id).cloned())
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostDoc>> {
        let state = self.state.read().await;
        let mut posts: Vec<PostDoc> = state
            .posts
            .values()
            .filter(|p| match &query {
                PostQuery::All => true,
                PostQuery::ByAuthors(authors) => authors.contains(&p.user),
                PostQuery::ByIds(ids) => ids.contains(&p.id),
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
        Ok(posts)
    }

    async fn push_comment(&self, post: &ObjectId, comment: CommentDoc) -> Result<Option<PostDoc>> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(post).map(|p| {
            p.comments.push(comment);
            p.metadata.touch();
            p.clone()
        }))
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.remove(id) else {
            return Ok(false);
        };
        for liker in &post.likes {
            if let Some(user) = state.users.get_mut(liker) {
                pull(&mut user.liked_posts, id);
            }
        }
        Ok(true)
    }

    async fn toggle_like(&self, actor: &ObjectId, post_id: &ObjectId) -> Result<LikeToggle> {
        let mut state = self.state.write().await;
        // Validate both sides before mutating anything
        state.user_mut(actor)?;
        let post = state
            .posts
            .get_mut(post_id)
            .ok_or(ChorusError::NotFound("Post"))?;

        let outcome = if post.is_liked_by(actor) {
            pull(&mut post.likes, actor);
            LikeOutcome::Unliked
        } else {
            add_to_set(&mut post.likes, *actor);
            LikeOutcome::Liked
        };
        post.metadata.touch();
        let owner = post.user;
        let likes = post.likes.clone();

        let user = state.user_mut(actor)?;
        match outcome {
            LikeOutcome::Liked => add_to_set(&mut user.liked_posts, *post_id),
            LikeOutcome::Unliked => pull(&mut user.liked_posts, post_id),
        }

        if outcome == LikeOutcome::Liked {
            if let Some(notification) = NotificationDoc::for_like(*actor, owner) {
                state.notifications.insert(notification.id, notification);
            }
        }

        Ok(LikeToggle { outcome, likes })
    }

    async fn take_notifications(&self, to: &ObjectId) -> Result<Vec<NotificationDoc>> {
        let mut state = self.state.write().await;
        let mut taken: Vec<NotificationDoc> = Vec::new();
        for notification in state.notifications.values_mut().filter(|n| n.to == *to) {
            taken.push(notification.clone());
            notification.read = true;
        }
        taken.sort_by(|a, b| {
            (b.metadata.created_at, b.id).cmp(&(a.metadata.created_at, a.id))
        });
        Ok(taken)
    }

    async fn find_notification(&self, id: &ObjectId) -> Result<Option<NotificationDoc>> {
        Ok(self.state.read().await.notifications.get(id).cloned())
    }

    async fn delete_notification(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.state.write().await.notifications.remove(id).is_some())
    }

    async fn delete_notifications_for(&self, to: &ObjectId) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state.notifications.retain(|_, n| n.to != *to);
        Ok((before - state.notifications.len()) as u64)
    }
}
