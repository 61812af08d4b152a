//! Post document schema
//!
//! A post carries optional text and image, an ordered list of embedded
//! comments and the set of identities that liked it.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{hex_ids, PublicUser};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Comment embedded in a post
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommentDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub text: String,
    /// Author
    pub user: ObjectId,
    pub created_at: DateTime,
}

impl CommentDoc {
    pub fn new(user: ObjectId, text: String) -> Self {
        Self {
            id: ObjectId::new(),
            text,
            user,
            created_at: DateTime::now(),
        }
    }
}

/// Post document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owner
    pub user: ObjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,

    /// Identities that liked this post
    #[serde(default)]
    pub likes: Vec<ObjectId>,

    #[serde(default)]
    pub comments: Vec<CommentDoc>,
}

impl PostDoc {
    pub fn new(user: ObjectId, text: Option<String>, img: Option<String>) -> Self {
        Self {
            id: ObjectId::new(),
            metadata: Metadata::new(),
            user,
            text,
            img,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn is_liked_by(&self, user: &ObjectId) -> bool {
        self.likes.contains(user)
    }

    /// Every identity referenced by this post (owner and commenters)
    pub fn referenced_users(&self) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::once(self.user).chain(self.comments.iter().map(|c| c.user))
    }

    /// Sort key for newest-first listings
    pub fn recency_key(&self) -> (Option<DateTime>, ObjectId) {
        (self.metadata.created_at, self.id)
    }

    /// Build the client view, populating authors from `users`
    pub fn to_view(&self, users: &HashMap<ObjectId, PublicUser>) -> PostView {
        PostView {
            id: self.id.to_hex(),
            user: users.get(&self.user).cloned(),
            text: self.text.clone(),
            img: self.img.clone(),
            likes: hex_ids(&self.likes),
            comments: self
                .comments
                .iter()
                .map(|c| CommentView {
                    id: c.id.to_hex(),
                    text: c.text.clone(),
                    user: users.get(&c.user).cloned(),
                    created_at: c.created_at.to_chrono(),
                })
                .collect(),
            created_at: self.metadata.created(),
            updated_at: self.metadata.updated(),
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_recent".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("recent".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Comment as seen by clients
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    /// None when the author no longer exists
    pub user: Option<PublicUser>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Post as seen by clients
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::UserDoc;

    #[test]
    fn test_view_populates_authors() {
        let owner = UserDoc::new("ada".into(), "Ada".into(), "ada@x.com".into(), "h".into());
        let commenter =
            UserDoc::new("grace".into(), "Grace".into(), "grace@x.com".into(), "h".into());

        let mut post = PostDoc::new(owner.id, Some("hello".into()), None);
        post.comments.push(CommentDoc::new(commenter.id, "hi".into()));
        post.likes.push(commenter.id);

        let users: HashMap<_, _> = [&owner, &commenter]
            .into_iter()
            .map(|u| (u.id, u.to_public()))
            .collect();
        let view = post.to_view(&users);

        assert_eq!(view.user.unwrap().username, "ada");
        assert_eq!(view.comments[0].user.as_ref().unwrap().username, "grace");
        assert_eq!(view.likes, vec![commenter.id.to_hex()]);

        let referenced: Vec<_> = post.referenced_users().collect();
        assert_eq!(referenced, vec![owner.id, commenter.id]);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let post = PostDoc::new(ObjectId::new(), None, Some("https://img/x.png".into()));
        let raw = bson::to_document(&post).unwrap();
        assert!(!raw.contains_key("text"));
        assert_eq!(raw.get_str("img").unwrap(), "https://img/x.png");
    }
}
