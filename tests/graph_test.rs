//! Follow and like invariants under concurrent toggles

use std::sync::Arc;

use bson::oid::ObjectId;
use chorus::auth::Identity;
use chorus::config::Args;
use chorus::db::schemas::{PostDoc, UserDoc};
use chorus::services::{graph, posts};
use chorus::store::SocialStore;
use chorus::AppState;
use tokio_test::assert_ok;

async fn seeded(names: &[&str]) -> (Arc<AppState>, Vec<UserDoc>) {
    let state = Arc::new(AppState::in_memory(Args::for_tests()).expect("state"));
    let mut users = Vec::new();
    for name in names {
        let user = UserDoc::new(
            name.to_string(),
            name.to_uppercase(),
            format!("{}@x.com", name),
            "h".into(),
        );
        assert_ok!(state.store.insert_user(user.clone()).await);
        users.push(user);
    }
    (state, users)
}

async fn reload(store: &dyn SocialStore, id: &ObjectId) -> UserDoc {
    store.find_user_by_id(id).await.unwrap().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_follow_toggles_stay_symmetric() {
    let (state, users) = seeded(&["ada", "grace", "linus"]).await;
    let actors = [users[0].clone(), users[2].clone()];
    let target = users[1].id;

    // 7 toggles per actor: each ends up following exactly once
    let mut handles = Vec::new();
    for actor in &actors {
        for _ in 0..7 {
            let state = Arc::clone(&state);
            let identity = Identity { user: actor.clone() };
            handles.push(tokio::spawn(async move {
                graph::toggle_follow(&state, &identity, &target).await
            }));
        }
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let target_doc = reload(state.store.as_ref(), &target).await;
    assert_eq!(target_doc.followers.len(), 2);
    for actor in &actors {
        let actor_doc = reload(state.store.as_ref(), &actor.id).await;
        assert_eq!(actor_doc.following, vec![target]);
        assert!(target_doc.followers.contains(&actor.id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_like_toggles_keep_both_sides_in_step() {
    let (state, users) = seeded(&["ada", "grace"]).await;
    let post = PostDoc::new(users[0].id, Some("hello".into()), None);
    let post_id = post.id;
    assert_ok!(state.store.insert_post(post).await);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let state = Arc::clone(&state);
        let identity = Identity { user: users[1].clone() };
        handles.push(tokio::spawn(async move {
            posts::toggle_like(&state, &identity, &post_id).await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    // Even number of toggles: back to the original state on both sides
    let post = state.store.find_post(&post_id).await.unwrap().unwrap();
    let grace = reload(state.store.as_ref(), &users[1].id).await;
    assert!(post.likes.is_empty());
    assert!(grace.liked_posts.is_empty());

    // Five like transitions, five notifications for the owner
    let notes = state.store.take_notifications(&users[0].id).await.unwrap();
    assert_eq!(notes.len(), 5);
}

#[tokio::test]
async fn test_self_like_notifies_nobody() {
    let (state, users) = seeded(&["ada"]).await;
    let post = PostDoc::new(users[0].id, Some("me".into()), None);
    let post_id = post.id;
    assert_ok!(state.store.insert_post(post).await);

    let identity = Identity { user: users[0].clone() };
    assert_ok!(posts::toggle_like(&state, &identity, &post_id).await);
    assert!(state.store.take_notifications(&users[0].id).await.unwrap().is_empty());
}
