//! Posts, likes and comments

use bson::oid::ObjectId;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::non_empty;
use crate::assets::asset_public_id;
use crate::auth::Identity;
use crate::db::schemas::{CommentDoc, PostDoc, PostView, PublicUser};
use crate::server::AppState;
use crate::store::{LikeToggle, PostQuery};
use crate::types::{ChorusError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    pub text: Option<String>,
    pub img: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Populate authors and comment authors for a batch of posts
async fn to_views(state: &AppState, posts: &[PostDoc]) -> Result<Vec<PostView>> {
    let ids: Vec<ObjectId> = posts
        .iter()
        .flat_map(|p| p.referenced_users())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let users: HashMap<ObjectId, PublicUser> = state
        .store
        .find_users_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, u.to_public()))
        .collect();

    Ok(posts.iter().map(|p| p.to_view(&users)).collect())
}

async fn to_view(state: &AppState, post: PostDoc) -> Result<PostView> {
    to_views(state, std::slice::from_ref(&post))
        .await?
        .pop()
        .ok_or_else(|| ChorusError::Internal("Post view missing".into()))
}

pub async fn create_post(
    state: &AppState,
    identity: &Identity,
    req: CreatePostRequest,
) -> Result<PostView> {
    let text = non_empty(req.text.as_deref()).map(str::to_string);
    let img = non_empty(req.img.as_deref());

    if text.is_none() && img.is_none() {
        return Err(ChorusError::Validation("Post must have text or image".into()));
    }

    let img = match img {
        Some(img) => Some(state.assets.upload(img).await?),
        None => None,
    };

    let post = PostDoc::new(identity.id(), text, img);
    state.store.insert_post(post.clone()).await?;
    info!(post_id = %post.id, user_id = %identity.id(), "Post created");

    to_view(state, post).await
}

/// Delete one of the caller's posts. Its image is destroyed first; if that
/// fails the post stays.
pub async fn delete_post(state: &AppState, identity: &Identity, post_id: &ObjectId) -> Result<()> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or(ChorusError::NotFound("Post"))?;

    if post.user != identity.id() {
        return Err(ChorusError::Unauthorized(
            "You can delete only your posts".into(),
        ));
    }

    if let Some(public_id) = post.img.as_deref().and_then(asset_public_id) {
        state.assets.destroy(public_id).await?;
    }

    if !state.store.delete_post(post_id).await? {
        return Err(ChorusError::NotFound("Post"));
    }
    info!(post_id = %post_id, "Post deleted");
    Ok(())
}

pub async fn toggle_like(
    state: &AppState,
    identity: &Identity,
    post_id: &ObjectId,
) -> Result<LikeToggle> {
    let toggle = state.store.toggle_like(&identity.id(), post_id).await?;
    info!(post_id = %post_id, user_id = %identity.id(), outcome = ?toggle.outcome, "Like toggled");
    Ok(toggle)
}

pub async fn add_comment(
    state: &AppState,
    identity: &Identity,
    post_id: &ObjectId,
    req: CommentRequest,
) -> Result<PostView> {
    let text = non_empty(Some(req.text.as_str()))
        .ok_or_else(|| ChorusError::Validation("Please enter text".into()))?;

    let post = state
        .store
        .push_comment(post_id, CommentDoc::new(identity.id(), text.to_string()))
        .await?
        .ok_or(ChorusError::NotFound("Post"))?;

    to_view(state, post).await
}

pub async fn all_posts(state: &AppState) -> Result<Vec<PostView>> {
    let posts = state.store.list_posts(PostQuery::All).await?;
    to_views(state, &posts).await
}

/// Posts by everyone the caller follows
pub async fn following_posts(state: &AppState, identity: &Identity) -> Result<Vec<PostView>> {
    if identity.user.following.is_empty() {
        return Ok(Vec::new());
    }
    let query = PostQuery::ByAuthors(identity.user.following.clone());
    let posts = state.store.list_posts(query).await?;
    to_views(state, &posts).await
}

pub async fn user_posts(state: &AppState, username: &str) -> Result<Vec<PostView>> {
    let user = state
        .store
        .find_user_by_username(username)
        .await?
        .ok_or(ChorusError::NotFound("User"))?;

    let posts = state.store.list_posts(PostQuery::ByAuthors(vec![user.id])).await?;
    to_views(state, &posts).await
}

pub async fn liked_posts(state: &AppState, user_id: &ObjectId) -> Result<Vec<PostView>> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or(ChorusError::NotFound("User"))?;

    if user.liked_posts.is_empty() {
        return Ok(Vec::new());
    }
    let posts = state.store.list_posts(PostQuery::ByIds(user.liked_posts)).await?;
    to_views(state, &posts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::db::schemas::UserDoc;
    use crate::assets::AssetHost;
    use crate::store::{LikeOutcome, MemoryStore};
    use async_trait::async_trait;
    use hyper::StatusCode;
    use std::sync::Arc;

    /// Accepts uploads as-is, never manages to destroy
    struct StuckAssetHost;

    #[async_trait]
    impl AssetHost for StuckAssetHost {
        async fn upload(&self, image: &str) -> Result<String> {
            Ok(image.to_string())
        }

        async fn destroy(&self, _public_id: &str) -> Result<()> {
            Err(ChorusError::Asset("host unavailable".into()))
        }
    }

    async fn seeded() -> (AppState, Identity, Identity) {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let ada = UserDoc::new("ada".into(), "Ada".into(), "ada@x.com".into(), "h".into());
        let grace = UserDoc::new("grace".into(), "Grace".into(), "grace@x.com".into(), "h".into());
        state.store.insert_user(ada.clone()).await.unwrap();
        state.store.insert_user(grace.clone()).await.unwrap();
        (state, Identity { user: ada }, Identity { user: grace })
    }

    fn text(t: &str) -> CreatePostRequest {
        CreatePostRequest {
            text: Some(t.into()),
            img: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_text_or_image() {
        let (state, ada, _) = seeded().await;

        let err = create_post(&state, &ada, CreatePostRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChorusError::Validation(_)));

        let blank = CreatePostRequest {
            text: Some("   ".into()),
            img: Some("".into()),
        };
        assert!(create_post(&state, &ada, blank).await.is_err());

        assert!(create_post(&state, &ada, text("hello")).await.is_ok());
        let image_only = CreatePostRequest {
            text: None,
            img: Some("https://img.local/p/cat.png".into()),
        };
        let view = create_post(&state, &ada, image_only).await.unwrap();
        assert_eq!(view.img.as_deref(), Some("https://img.local/p/cat.png"));
        assert_eq!(view.user.unwrap().username, "ada");
    }

    #[tokio::test]
    async fn test_only_owner_deletes() {
        let (state, ada, grace) = seeded().await;
        let post = create_post(&state, &ada, text("mine")).await.unwrap();
        let id = ObjectId::parse_str(&post.id).unwrap();

        let err = delete_post(&state, &grace, &id).await.unwrap_err();
        assert!(matches!(err, ChorusError::Unauthorized(_)));
        assert!(state.store.find_post(&id).await.unwrap().is_some());

        delete_post(&state, &ada, &id).await.unwrap();
        assert!(state.store.find_post(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_image_destroy_keeps_post() {
        let state = AppState::new(
            Args::for_tests(),
            Arc::new(MemoryStore::default()),
            Arc::new(StuckAssetHost),
        )
        .unwrap();
        let ada = UserDoc::new("ada".into(), "Ada".into(), "ada@x.com".into(), "h".into());
        state.store.insert_user(ada.clone()).await.unwrap();
        let ada = Identity { user: ada };

        let req = CreatePostRequest {
            text: Some("with picture".into()),
            img: Some("https://img.local/p/cat.png".into()),
        };
        let post = create_post(&state, &ada, req).await.unwrap();
        let id = ObjectId::parse_str(&post.id).unwrap();

        let err = delete_post(&state, &ada, &id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL");
        assert!(state.store.find_post(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_like_toggle_parity() {
        let (state, ada, grace) = seeded().await;
        let post = create_post(&state, &ada, text("like me")).await.unwrap();
        let id = ObjectId::parse_str(&post.id).unwrap();

        let mut last = None;
        for _ in 0..4 {
            last = Some(toggle_like(&state, &grace, &id).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.outcome, LikeOutcome::Unliked);
        assert!(last.likes.is_empty());

        let odd = toggle_like(&state, &grace, &id).await.unwrap();
        assert_eq!(odd.outcome, LikeOutcome::Liked);
        assert_eq!(odd.likes, vec![grace.id()]);

        let liked = liked_posts(&state, &grace.id()).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].id, post.id);
    }

    #[tokio::test]
    async fn test_comment_validation_and_population() {
        let (state, ada, grace) = seeded().await;
        let post = create_post(&state, &ada, text("talk")).await.unwrap();
        let id = ObjectId::parse_str(&post.id).unwrap();

        let err = add_comment(&state, &grace, &id, CommentRequest { text: " ".into() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter text");

        let err = add_comment(&state, &grace, &ObjectId::new(), CommentRequest { text: "hi".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ChorusError::NotFound("Post")));

        let view = add_comment(&state, &grace, &id, CommentRequest { text: "hi".into() })
            .await
            .unwrap();
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].user.as_ref().unwrap().username, "grace");

        // Comments notify nobody
        assert!(state.store.take_notifications(&ada.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feeds_newest_first() {
        let (state, ada, grace) = seeded().await;
        create_post(&state, &ada, text("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        create_post(&state, &ada, text("second")).await.unwrap();

        let all = all_posts(&state).await.unwrap();
        assert_eq!(all[0].text.as_deref(), Some("second"));
        assert_eq!(all[1].text.as_deref(), Some("first"));

        assert!(following_posts(&state, &grace).await.unwrap().is_empty());
        state.store.toggle_follow(&grace.id(), &ada.id()).await.unwrap();
        let grace = Identity {
            user: state.store.find_user_by_id(&grace.id()).await.unwrap().unwrap(),
        };
        assert_eq!(following_posts(&state, &grace).await.unwrap().len(), 2);

        assert_eq!(user_posts(&state, "ada").await.unwrap().len(), 2);
        assert!(user_posts(&state, "grace").await.unwrap().is_empty());
        assert!(matches!(
            user_posts(&state, "nobody").await.unwrap_err(),
            ChorusError::NotFound("User")
        ));
    }
}
