//! User document schema
//!
//! Stores credentials, profile fields and the social edges of one identity.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::hex_ids;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique handle
    pub username: String,

    pub full_name: String,

    /// Argon2 password hash
    pub password_hash: String,

    pub email: String,

    /// Identities following this one
    #[serde(default)]
    pub followers: Vec<ObjectId>,

    /// Identities this one follows
    #[serde(default)]
    pub following: Vec<ObjectId>,

    #[serde(default)]
    pub profile_img: String,

    #[serde(default)]
    pub cover_img: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub link: String,

    /// Posts this identity has liked
    #[serde(default)]
    pub liked_posts: Vec<ObjectId>,
}

impl UserDoc {
    /// Create a new user document with a fresh id
    pub fn new(username: String, full_name: String, email: String, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            metadata: Metadata::new(),
            username,
            full_name,
            password_hash,
            email,
            followers: Vec::new(),
            following: Vec::new(),
            profile_img: String::new(),
            cover_img: String::new(),
            bio: String::new(),
            link: String::new(),
            liked_posts: Vec::new(),
        }
    }

    pub fn is_following(&self, other: &ObjectId) -> bool {
        self.following.contains(other)
    }

    /// Public projection (never carries the password hash)
    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Identity as seen by clients
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub profile_img: String,
    pub cover_img: String,
    pub bio: String,
    pub link: String,
    pub liked_posts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&UserDoc> for PublicUser {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            followers: hex_ids(&user.followers),
            following: hex_ids(&user.following),
            profile_img: user.profile_img.clone(),
            cover_img: user.cover_img.clone(),
            bio: user.bio.clone(),
            link: user.link.clone(),
            liked_posts: hex_ids(&user.liked_posts),
            created_at: user.metadata.created(),
            updated_at: user.metadata.updated(),
        }
    }
}
