//! Follow graph

use bson::oid::ObjectId;
use tracing::info;

use crate::auth::Identity;
use crate::server::AppState;
use crate::store::FollowOutcome;
use crate::types::{ChorusError, Result};

/// Follow `target` if the caller does not follow it yet, else unfollow.
/// Both sides of the edge change together or not at all.
pub async fn toggle_follow(
    state: &AppState,
    identity: &Identity,
    target: &ObjectId,
) -> Result<FollowOutcome> {
    if *target == identity.id() {
        return Err(ChorusError::SelfAction(
            "You can't follow/unfollow yourself".into(),
        ));
    }

    let outcome = state.store.toggle_follow(&identity.id(), target).await?;
    info!(actor = %identity.id(), target = %target, ?outcome, "Follow toggled");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use crate::db::schemas::UserDoc;

    async fn seeded() -> (AppState, Identity, UserDoc) {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let ada = UserDoc::new("ada".into(), "Ada".into(), "ada@x.com".into(), "h".into());
        let grace = UserDoc::new("grace".into(), "Grace".into(), "grace@x.com".into(), "h".into());
        state.store.insert_user(ada.clone()).await.unwrap();
        state.store.insert_user(grace.clone()).await.unwrap();
        (state, Identity { user: ada }, grace)
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let (state, ada, _) = seeded().await;
        let err = toggle_follow(&state, &ada, &ada.id()).await.unwrap_err();
        assert!(matches!(err, ChorusError::SelfAction(_)));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let (state, ada, _) = seeded().await;
        let err = toggle_follow(&state, &ada, &ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, ChorusError::NotFound("User")));
    }

    #[tokio::test]
    async fn test_toggle_pair_restores_graph() {
        let (state, ada, grace) = seeded().await;

        let first = toggle_follow(&state, &ada, &grace.id).await.unwrap();
        let second = toggle_follow(&state, &ada, &grace.id).await.unwrap();
        assert_eq!((first, second), (FollowOutcome::Followed, FollowOutcome::Unfollowed));

        let ada_now = state.store.find_user_by_id(&ada.id()).await.unwrap().unwrap();
        let grace_now = state.store.find_user_by_id(&grace.id).await.unwrap().unwrap();
        assert!(ada_now.following.is_empty());
        assert!(grace_now.followers.is_empty());

        // Only the follow created a notification
        let notes = state.store.take_notifications(&grace.id).await.unwrap();
        assert_eq!(notes.len(), 1);
    }
}
