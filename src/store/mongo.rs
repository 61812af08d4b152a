//! MongoDB-backed store
//!
//! Follow toggles, like toggles and post deletion each run inside one
//! multi-document transaction, so the server must be a replica set (a
//! single-node replica set is enough). Transient transaction errors, such
//! as write conflicts between two concurrent toggles, are retried.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR},
    options::ReturnDocument,
    ClientSession,
};
use tracing::{debug, warn};

use super::{FollowOutcome, LikeOutcome, LikeToggle, PostQuery, SocialStore};
use crate::db::schemas::{
    CommentDoc, NotificationDoc, NotificationKind, PostDoc, UserDoc, NOTIFICATION_COLLECTION,
    POST_COLLECTION, USER_COLLECTION,
};
use crate::db::{is_duplicate_key, MongoClient, MongoCollection};
use crate::types::{ChorusError, Result};

/// Attempts per transaction before a transient error is surfaced
const MAX_TX_ATTEMPTS: u32 = 5;

/// Failure inside a transaction body: either a domain error (abort and
/// report) or a driver error (abort, maybe retry)
enum TxError {
    Domain(ChorusError),
    Mongo(MongoError),
}

impl From<ChorusError> for TxError {
    fn from(err: ChorusError) -> Self {
        Self::Domain(err)
    }
}

impl From<MongoError> for TxError {
    fn from(err: MongoError) -> Self {
        Self::Mongo(err)
    }
}

impl From<bson::ser::Error> for TxError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Domain(err.into())
    }
}

impl From<TxError> for ChorusError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Domain(e) => e,
            TxError::Mongo(e) => e.into(),
        }
    }
}

fn is_transient(err: &MongoError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// Run `$body` (an expression using `&mut $session`) in a transaction,
/// committing on success and aborting on failure.
macro_rules! in_transaction {
    ($client:expr, $op:literal, $session:ident => $body:expr) => {{
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut $session = $client.start_session().await?;
            $session.start_transaction().await?;

            match $body.await {
                Ok(value) => match $session.commit_transaction().await {
                    Ok(()) => break Ok(value),
                    Err(e) if is_transient(&e) && attempt < MAX_TX_ATTEMPTS => {
                        debug!(op = $op, attempt, "Retrying transaction commit: {}", e);
                    }
                    Err(e) => break Err(ChorusError::from(e)),
                },
                Err(err) => {
                    if let Err(e) = $session.abort_transaction().await {
                        warn!(op = $op, "Abort failed: {}", e);
                    }
                    match err {
                        TxError::Mongo(e) if is_transient(&e) && attempt < MAX_TX_ATTEMPTS => {
                            debug!(op = $op, attempt, "Retrying transaction: {}", e);
                        }
                        other => break Err(ChorusError::from(other)),
                    }
                }
            }
        }
    }};
}

/// Map a unique index violation on the users collection to `Conflict`
fn user_conflict(err: MongoError) -> ChorusError {
    match is_duplicate_key(&err) {
        Some(message) if message.contains("email") => ChorusError::Conflict { field: "Email" },
        Some(_) => ChorusError::Conflict { field: "Username" },
        None => err.into(),
    }
}

fn by_id(id: &ObjectId) -> Document {
    doc! { "_id": id }
}

fn post_filter(query: &PostQuery) -> Document {
    match query {
        PostQuery::All => doc! {},
        PostQuery::ByAuthors(authors) => doc! { "user": { "$in": authors.clone() } },
        PostQuery::ByIds(ids) => doc! { "_id": { "$in": ids.clone() } },
    }
}

/// Newest first, ties broken by id
fn newest_first() -> Document {
    doc! { "metadata.created_at": -1, "_id": -1 }
}

/// `$addToSet` when `add`, else `$pull`
fn edge_update(add: bool, field: &str, id: &ObjectId) -> Document {
    let op = if add { "$addToSet" } else { "$pull" };
    let mut edge = Document::new();
    edge.insert(field, *id);
    let mut update = Document::new();
    update.insert(op, edge);
    update
}

pub struct MongoStore {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
    posts: MongoCollection<PostDoc>,
    notifications: MongoCollection<NotificationDoc>,
}

impl MongoStore {
    /// Open the collections, creating their indexes
    pub async fn new(client: MongoClient) -> Result<Self> {
        let users = client.collection(USER_COLLECTION).await?;
        let posts = client.collection(POST_COLLECTION).await?;
        let notifications = client.collection(NOTIFICATION_COLLECTION).await?;

        Ok(Self {
            client,
            users,
            posts,
            notifications,
        })
    }

    async fn toggle_follow_in(
        &self,
        s: &mut ClientSession,
        actor: &ObjectId,
        target: &ObjectId,
    ) -> std::result::Result<FollowOutcome, TxError> {
        let actor_doc = self
            .users
            .find_one(by_id(actor), Some(&mut *s))
            .await?
            .ok_or(ChorusError::NotFound("User"))?;
        if self.users.find_one(by_id(target), Some(&mut *s)).await?.is_none() {
            return Err(ChorusError::NotFound("User").into());
        }

        let follow = !actor_doc.is_following(target);
        self.users
            .update_one(by_id(actor), edge_update(follow, "following", target), Some(&mut *s))
            .await?;
        self.users
            .update_one(by_id(target), edge_update(follow, "followers", actor), Some(&mut *s))
            .await?;

        if !follow {
            return Ok(FollowOutcome::Unfollowed);
        }
        let notification = NotificationDoc::new(NotificationKind::Follow, *actor, *target);
        self.notifications.insert_one(notification, Some(&mut *s)).await?;
        Ok(FollowOutcome::Followed)
    }

    async fn toggle_like_in(
        &self,
        s: &mut ClientSession,
        actor: &ObjectId,
        post_id: &ObjectId,
    ) -> std::result::Result<LikeToggle, TxError> {
        let post = self
            .posts
            .find_one(by_id(post_id), Some(&mut *s))
            .await?
            .ok_or(ChorusError::NotFound("Post"))?;
        if self.users.find_one(by_id(actor), Some(&mut *s)).await?.is_none() {
            return Err(ChorusError::NotFound("User").into());
        }

        let like = !post.is_liked_by(actor);
        self.posts
            .update_one(by_id(post_id), edge_update(like, "likes", actor), Some(&mut *s))
            .await?;
        self.users
            .update_one(by_id(actor), edge_update(like, "liked_posts", post_id), Some(&mut *s))
            .await?;

        let mut likes = post.likes;
        let outcome = if like {
            likes.push(*actor);
            if let Some(notification) = NotificationDoc::for_like(*actor, post.user) {
                self.notifications.insert_one(notification, Some(&mut *s)).await?;
            }
            LikeOutcome::Liked
        } else {
            likes.retain(|id| id != actor);
            LikeOutcome::Unliked
        };

        Ok(LikeToggle { outcome, likes })
    }

    async fn delete_post_in(
        &self,
        s: &mut ClientSession,
        id: &ObjectId,
    ) -> std::result::Result<bool, TxError> {
        let Some(post) = self.posts.find_one(by_id(id), Some(&mut *s)).await? else {
            return Ok(false);
        };

        self.posts.inner().delete_one(by_id(id)).session(&mut *s).await?;
        if !post.likes.is_empty() {
            self.users
                .inner()
                .update_many(
                    doc! { "_id": { "$in": post.likes } },
                    doc! {
                        "$pull": { "liked_posts": id },
                        "$set": { "metadata.updated_at": DateTime::now() },
                    },
                )
                .session(&mut *s)
                .await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl SocialStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn insert_user(&self, user: UserDoc) -> Result<()> {
        self.users.insert_one(user, None).await.map_err(user_conflict)
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users.find_one(by_id(id), None).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        Ok(self.users.find_one(doc! { "username": username }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<UserDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.users
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None, None)
            .await
    }

    async fn update_user_profile(&self, user: &UserDoc) -> Result<()> {
        let update = doc! {
            "$set": {
                "username": &user.username,
                "full_name": &user.full_name,
                "email": &user.email,
                "password_hash": &user.password_hash,
                "profile_img": &user.profile_img,
                "cover_img": &user.cover_img,
                "bio": &user.bio,
                "link": &user.link,
            }
        };
        let result = self
            .users
            .update_one(by_id(&user.id), update, None)
            .await
            .map_err(user_conflict)?;

        if result.matched_count == 0 {
            return Err(ChorusError::NotFound("User"));
        }
        Ok(())
    }

    async fn suggested_users(&self, excluded: &[ObjectId], sample: usize) -> Result<Vec<UserDoc>> {
        let pipeline = vec![
            doc! { "$match": { "_id": { "$nin": excluded.to_vec() } } },
            doc! { "$sample": { "size": sample as i64 } },
        ];
        let raw: Vec<Document> = self
            .users
            .inner()
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        raw.into_iter()
            .map(|d| bson::from_document(d).map_err(ChorusError::from))
            .collect()
    }

    async fn toggle_follow(&self, actor: &ObjectId, target: &ObjectId) -> Result<FollowOutcome> {
        in_transaction!(self.client, "toggle_follow", session => {
            self.toggle_follow_in(&mut session, actor, target)
        })
    }

    async fn insert_post(&self, post: PostDoc) -> Result<()> {
        Ok(self.posts.insert_one(post, None).await?)
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<PostDoc>> {
        Ok(self.posts.find_one(by_id(id), None).await?)
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostDoc>> {
        self.posts
            .find_many(post_filter(&query), Some(newest_first()), None)
            .await
    }

    async fn push_comment(&self, post: &ObjectId, comment: CommentDoc) -> Result<Option<PostDoc>> {
        let update = doc! {
            "$push": { "comments": bson::to_bson(&comment)? },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        Ok(self
            .posts
            .inner()
            .find_one_and_update(by_id(post), update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool> {
        in_transaction!(self.client, "delete_post", session => {
            self.delete_post_in(&mut session, id)
        })
    }

    async fn toggle_like(&self, actor: &ObjectId, post: &ObjectId) -> Result<LikeToggle> {
        in_transaction!(self.client, "toggle_like", session => {
            self.toggle_like_in(&mut session, actor, post)
        })
    }

    async fn take_notifications(&self, to: &ObjectId) -> Result<Vec<NotificationDoc>> {
        let taken = self
            .notifications
            .find_many(doc! { "to": to }, Some(newest_first()), None)
            .await?;

        // Only mark what was returned; anything created since stays unread
        let unread: Vec<ObjectId> = taken.iter().filter(|n| !n.read).map(|n| n.id).collect();
        if !unread.is_empty() {
            self.notifications
                .inner()
                .update_many(
                    doc! { "_id": { "$in": unread } },
                    doc! { "$set": { "read": true, "metadata.updated_at": DateTime::now() } },
                )
                .await?;
        }
        Ok(taken)
    }

    async fn find_notification(&self, id: &ObjectId) -> Result<Option<NotificationDoc>> {
        Ok(self.notifications.find_one(by_id(id), None).await?)
    }

    async fn delete_notification(&self, id: &ObjectId) -> Result<bool> {
        let result = self.notifications.inner().delete_one(by_id(id)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_notifications_for(&self, to: &ObjectId) -> Result<u64> {
        let result = self
            .notifications
            .inner()
            .delete_many(doc! { "to": to })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_update_ops() {
        let id = ObjectId::new();
        let add = edge_update(true, "following", &id);
        assert_eq!(
            add.get_document("$addToSet").unwrap().get_object_id("following").unwrap(),
            id
        );

        let pull = edge_update(false, "likes", &id);
        assert_eq!(pull.get_document("$pull").unwrap().get_object_id("likes").unwrap(), id);
    }

    #[test]
    fn test_post_filters() {
        assert!(post_filter(&PostQuery::All).is_empty());

        let author = ObjectId::new();
        let f = post_filter(&PostQuery::ByAuthors(vec![author]));
        let ids = f.get_document("user").unwrap().get_array("$in").unwrap();
        assert_eq!(ids.len(), 1);

        let f = post_filter(&PostQuery::ByIds(vec![]));
        assert!(f.get_document("_id").unwrap().get_array("$in").unwrap().is_empty());
    }

    #[test]
    fn test_newest_first_breaks_ties_by_id() {
        let sort = newest_first();
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["metadata.created_at", "_id"]);
    }

    #[test]
    fn test_domain_error_passes_through_transaction() {
        let err: ChorusError = TxError::from(ChorusError::NotFound("Post")).into();
        assert!(matches!(err, ChorusError::NotFound("Post")));
    }
}
