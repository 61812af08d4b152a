//! Identity lifecycle: signup, login, profile reads and updates,
//! follow suggestions

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{info, warn};

use super::non_empty;
use crate::assets::asset_public_id;
use crate::auth::password::check_password_strength;
use crate::auth::{hash_password, verify_password, Identity, IssuedToken};
use crate::db::schemas::{PublicUser, UserDoc};
use crate::server::AppState;
use crate::types::{ChorusError, Result};

/// local-part@domain.tld, no whitespace
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Random candidates drawn for suggestions
const SUGGESTION_SAMPLE: usize = 10;

/// Suggestions returned to the client
const SUGGESTION_LIMIT: usize = 4;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Profile changes; absent or blank fields keep the stored value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub link: Option<String>,
    pub profile_img: Option<String>,
    pub cover_img: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// An identity together with the session issued for it
#[derive(Debug)]
pub struct Session {
    pub user: UserDoc,
    pub token: IssuedToken,
}

fn email_pattern() -> Result<&'static Regex> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = EMAIL.get() {
        return Ok(re);
    }
    let re = Regex::new(EMAIL_PATTERN)
        .map_err(|e| ChorusError::Internal(format!("Email pattern: {}", e)))?;
    Ok(EMAIL.get_or_init(|| re))
}

fn check_email(email: &str) -> Result<()> {
    if email_pattern()?.is_match(email) {
        Ok(())
    } else {
        Err(ChorusError::Validation("Invalid email format".into()))
    }
}

fn check_username(username: &str) -> Result<()> {
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(ChorusError::Validation(
            "Username must be non-empty and contain no whitespace".into(),
        ));
    }
    Ok(())
}

/// Hash compared against when the handle is unknown, so both login
/// failure paths cost one password verification
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("chorus-decoy-password").unwrap_or_default())
}

pub async fn signup(state: &AppState, req: SignupRequest) -> Result<Session> {
    let username = req.username.trim();
    let email = req.email.trim();
    let full_name = req.full_name.trim();

    if full_name.is_empty() {
        return Err(ChorusError::Validation("Full name is required".into()));
    }
    check_username(username)?;
    check_email(email)?;
    check_password_strength(&req.password)?;

    if state.store.find_user_by_username(username).await?.is_some() {
        return Err(ChorusError::Conflict { field: "Username" });
    }
    if state.store.find_user_by_email(email).await?.is_some() {
        return Err(ChorusError::Conflict { field: "Email" });
    }

    let user = UserDoc::new(
        username.to_string(),
        full_name.to_string(),
        email.to_string(),
        hash_password(&req.password)?,
    );
    // The store re-checks uniqueness; a concurrent signup loses there
    state.store.insert_user(user.clone()).await?;
    let token = state.sessions.issue(&user.id)?;

    info!(user_id = %user.id, username = %user.username, "Identity created");
    Ok(Session { user, token })
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<Session> {
    let Some(user) = state.store.find_user_by_username(req.username.trim()).await? else {
        let _ = verify_password(&req.password, decoy_hash());
        warn!(username = %req.username, "Login failed");
        return Err(ChorusError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(username = %req.username, "Login failed");
        return Err(ChorusError::InvalidCredentials);
    }

    let token = state.sessions.issue(&user.id)?;
    info!(user_id = %user.id, "Login succeeded");
    Ok(Session { user, token })
}

pub fn me(identity: &Identity) -> PublicUser {
    identity.user.to_public()
}

pub async fn profile(state: &AppState, username: &str) -> Result<PublicUser> {
    state
        .store
        .find_user_by_username(username)
        .await?
        .map(|u| u.to_public())
        .ok_or(ChorusError::NotFound("User"))
}

/// Identities the caller does not follow yet, excluding the caller
pub async fn suggested(state: &AppState, identity: &Identity) -> Result<Vec<PublicUser>> {
    let mut excluded = identity.user.following.clone();
    excluded.push(identity.id());

    let sample = state.store.suggested_users(&excluded, SUGGESTION_SAMPLE).await?;
    Ok(sample
        .iter()
        .take(SUGGESTION_LIMIT)
        .map(UserDoc::to_public)
        .collect())
}

/// Release images replaced by a saved profile update; failures are logged
async fn release_images(state: &AppState, replaced: &[String]) {
    for url in replaced {
        let Some(public_id) = asset_public_id(url) else {
            continue;
        };
        if let Err(e) = state.assets.destroy(public_id).await {
            warn!(public_id, "Failed to destroy replaced image: {}", e);
        }
    }
}

pub async fn update_profile(
    state: &AppState,
    identity: &Identity,
    req: UpdateProfileRequest,
) -> Result<PublicUser> {
    // Re-read for the password hash, which `Identity` does not carry
    let mut user = state
        .store
        .find_user_by_id(&identity.id())
        .await?
        .ok_or(ChorusError::UnknownIdentity)?;

    match (
        non_empty(req.current_password.as_deref()),
        non_empty(req.new_password.as_deref()),
    ) {
        (Some(current), Some(new)) => {
            if !verify_password(current, &user.password_hash)? {
                return Err(ChorusError::Validation("Current password is incorrect".into()));
            }
            check_password_strength(new)?;
            user.password_hash = hash_password(new)?;
        }
        (None, None) => {}
        _ => {
            return Err(ChorusError::Validation(
                "Please provide both current password and new password".into(),
            ))
        }
    }

    if let Some(username) = non_empty(req.username.as_deref()) {
        if username != user.username {
            check_username(username)?;
            if state.store.find_user_by_username(username).await?.is_some() {
                return Err(ChorusError::Conflict { field: "Username" });
            }
            user.username = username.to_string();
        }
    }

    if let Some(email) = non_empty(req.email.as_deref()) {
        if email != user.email {
            check_email(email)?;
            if state.store.find_user_by_email(email).await?.is_some() {
                return Err(ChorusError::Conflict { field: "Email" });
            }
            user.email = email.to_string();
        }
    }

    if let Some(full_name) = non_empty(req.full_name.as_deref()) {
        user.full_name = full_name.to_string();
    }
    if let Some(bio) = non_empty(req.bio.as_deref()) {
        user.bio = bio.to_string();
    }
    if let Some(link) = non_empty(req.link.as_deref()) {
        user.link = link.to_string();
    }

    // Old images are released only once the new references are stored
    let mut replaced = Vec::new();
    if let Some(img) = non_empty(req.profile_img.as_deref()) {
        let uploaded = state.assets.upload(img).await?;
        replaced.push(std::mem::replace(&mut user.profile_img, uploaded));
    }
    if let Some(img) = non_empty(req.cover_img.as_deref()) {
        let uploaded = state.assets.upload(img).await?;
        replaced.push(std::mem::replace(&mut user.cover_img, uploaded));
    }

    state.store.update_user_profile(&user).await?;
    info!(user_id = %user.id, "Profile updated");
    release_images(state, &replaced).await;

    let stored = state
        .store
        .find_user_by_id(&user.id)
        .await?
        .ok_or(ChorusError::UnknownIdentity)?;
    Ok(stored.to_public())
}
