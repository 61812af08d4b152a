//! Notification listing and cleanup

use bson::oid::ObjectId;
use std::collections::HashMap;
use tracing::info;

use crate::auth::Identity;
use crate::db::schemas::{NotificationActor, NotificationView};
use crate::server::AppState;
use crate::types::{ChorusError, Result};

/// The caller's notifications, newest first, with the acting identity's
/// handle and avatar populated.
///
/// Not idempotent: every returned notification is marked read, so a second
/// call returns the same set with `read: true`.
pub async fn list_and_mark_read(state: &AppState, identity: &Identity) -> Result<Vec<NotificationView>> {
    let notifications = state.store.take_notifications(&identity.id()).await?;

    let mut actor_ids: Vec<ObjectId> = notifications.iter().map(|n| n.from).collect();
    actor_ids.sort();
    actor_ids.dedup();

    let actors: HashMap<ObjectId, NotificationActor> = state
        .store
        .find_users_by_ids(&actor_ids)
        .await?
        .iter()
        .map(|u| (u.id, NotificationActor::from(u)))
        .collect();

    Ok(notifications.iter().map(|n| n.to_view(&actors)).collect())
}

pub async fn delete_all(state: &AppState, identity: &Identity) -> Result<u64> {
    let deleted = state.store.delete_notifications_for(&identity.id()).await?;
    info!(user_id = %identity.id(), deleted, "Notifications deleted");
    Ok(deleted)
}

/// Delete one notification addressed to the caller
pub async fn delete_one(state: &AppState, identity: &Identity, id: &ObjectId) -> Result<()> {
    let notification = state
        .store
        .find_notification(id)
        .await?
        .ok_or(ChorusError::NotFound("Notification"))?;

    if notification.to != identity.id() {
        return Err(ChorusError::Unauthorized(
            "You are not allowed to delete this notification".into(),
        ));
    }

    state.store.delete_notification(id).await?;
    Ok(())
}
